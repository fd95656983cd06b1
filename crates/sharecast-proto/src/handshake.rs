//! Handshake messages.
//!
//! The first message on a new connection is a JSON object with a `role`
//! field. Users then answer an echo challenge; hosts and slaves authenticate
//! with the host's shared secret:
//!
//! ```text
//! user:   {"role":"user"}  <- rand.check:<i>  -> {"rand.back":<i+1>}
//! host:   {"role":"host","host_name":..,"host_secret":..}
//! slave:  {"role":"slave","host_name":..,"host_secret":..,"salve_name":..}
//! ```
//!
//! The slave name travels as `salve_name`, the spelling deployed clients use.
//! `slave_name` is accepted as well.

use serde_json::{Map, Value};

use crate::names::field;
use crate::{ProtoError, Result, RoleName};

/// A decoded opening message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handshake {
    /// A viewer; authenticated by the echo challenge that follows.
    User,
    /// A host presenting its name and secret.
    Host {
        /// Registered host name.
        host_name: String,
        /// Shared secret for `host_name`.
        host_secret: String,
    },
    /// A slave presenting its owning host's credentials and its own name.
    Slave {
        /// Owning host's name.
        host_name: String,
        /// Owning host's shared secret.
        host_secret: String,
        /// The slave's provisioned name.
        slave_name: String,
    },
}

impl Handshake {
    /// Decode an opening message.
    pub fn parse(value: &Value) -> Result<Self> {
        let obj = value.as_object().ok_or(ProtoError::NotAnObject)?;
        let role: RoleName = required_str(obj, field::ROLE)?.parse()?;
        match role {
            RoleName::User => Ok(Handshake::User),
            RoleName::Host => Ok(Handshake::Host {
                host_name: required_str(obj, field::HOST_NAME)?.to_string(),
                host_secret: required_str(obj, field::HOST_SECRET)?.to_string(),
            }),
            RoleName::Slave => {
                let slave_name = match obj.get(field::SALVE_NAME) {
                    Some(_) => required_str(obj, field::SALVE_NAME)?,
                    None => required_str(obj, field::SLAVE_NAME)
                        .map_err(|_| ProtoError::MissingField(field::SALVE_NAME))?,
                };
                Ok(Handshake::Slave {
                    host_name: required_str(obj, field::HOST_NAME)?.to_string(),
                    host_secret: required_str(obj, field::HOST_SECRET)?.to_string(),
                    slave_name: slave_name.to_string(),
                })
            }
        }
    }

    /// The role this handshake claims.
    pub fn role(&self) -> RoleName {
        match self {
            Handshake::User => RoleName::User,
            Handshake::Host { .. } => RoleName::Host,
            Handshake::Slave { .. } => RoleName::Slave,
        }
    }
}

/// Extract the numeric `rand.back` answer from a user's echo reply.
///
/// The value must be a JSON number with no fractional part; strings are
/// rejected even when they spell a number.
pub fn echo_reply(value: &Value) -> Result<i64> {
    let obj = value.as_object().ok_or(ProtoError::NotAnObject)?;
    let raw = obj
        .get(field::RAND_BACK)
        .ok_or(ProtoError::MissingField(field::RAND_BACK))?;
    let invalid = ProtoError::InvalidField {
        field: field::RAND_BACK,
        expected: "an integer",
    };
    if let Some(n) = raw.as_i64() {
        return Ok(n);
    }
    match raw.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => Ok(f as i64),
        _ => Err(invalid),
    }
}

fn required_str<'a>(obj: &'a Map<String, Value>, name: &'static str) -> Result<&'a str> {
    match obj.get(name) {
        None | Some(Value::Null) => Err(ProtoError::MissingField(name)),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ProtoError::InvalidField {
            field: name,
            expected: "a string",
        }),
    }
}
