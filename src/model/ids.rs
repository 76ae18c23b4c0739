use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let id = String::deserialize(deserializer)?;
                Self::try_new(id).ok_or_else(|| {
                    <D::Error as de::Error>::custom(concat!(stringify!($name), " cannot be empty"))
                })
            }
        }

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                let id = s.into();
                assert!(!id.is_empty(), "{} cannot be empty", stringify!($name));
                Self(id)
            }

            /// Non-panicking constructor for ids read off the wire.
            pub fn try_new(s: impl Into<String>) -> Option<Self> {
                let id = s.into();
                if id.is_empty() {
                    None
                } else {
                    Some(Self(id))
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

id_newtype!(SessionId);
id_newtype!(ToolCallId);
id_newtype!(MessageId);

impl MessageId {
    /// Fresh random id for a message assembled by the engine.
    pub fn fresh() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}
