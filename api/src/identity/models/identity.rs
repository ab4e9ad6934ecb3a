use diesel::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::identities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Identity {
    pub id: i32,
    pub traits: JsonValue,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

impl Identity {
    pub fn get_traits(&self) -> Traits {
        Traits::from(self.traits.clone())
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Traits {
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<JsonValue> for Traits {
    fn from(value: JsonValue) -> Self {
        serde_json::from_value(value).unwrap_or_else(|err| {
            tracing::error!(?err, "Invalid identity traits, using empty traits");
            Traits::default()
        })
    }
}
