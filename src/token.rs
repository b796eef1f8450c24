// Check-in token codec.
//
// Wire format is `CLIPCONTROL:<secret>:<auxiliary id>`, exactly two colons,
// scheme literal compared case-sensitively. Emptiness of the two payload
// fields is accepted here; whether they mean anything is the backend's call.

use crate::error::CheckInError;
use std::fmt;
use std::str::FromStr;

pub const SCHEME: &str = "CLIPCONTROL";
const SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CheckInToken {
    secret: String,
    auxiliary_id: String,
}

impl CheckInToken {
    /// Build a token from its payload fields. Fails if either field contains
    /// the separator, since the result could not be decoded back.
    pub fn new(
        secret: impl Into<String>,
        auxiliary_id: impl Into<String>,
    ) -> Result<Self, CheckInError> {
        let secret = secret.into();
        let auxiliary_id = auxiliary_id.into();
        if secret.contains(SEPARATOR) || auxiliary_id.contains(SEPARATOR) {
            return Err(CheckInError::Format(
                "token fields may not contain ':'".to_owned(),
            ));
        }
        Ok(CheckInToken {
            secret,
            auxiliary_id,
        })
    }

    pub fn scheme(&self) -> &'static str {
        SCHEME
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn auxiliary_id(&self) -> &str {
        &self.auxiliary_id
    }
}

pub fn decode(raw: &str) -> Result<CheckInToken, CheckInError> {
    let fields: Vec<&str> = raw.split(SEPARATOR).collect();
    if fields.len() != 3 {
        return Err(CheckInError::Format(format!(
            "expected 3 fields, found {}",
            fields.len()
        )));
    }
    if fields[0] != SCHEME {
        return Err(CheckInError::Format("unknown scheme".to_owned()));
    }
    Ok(CheckInToken {
        secret: fields[1].to_owned(),
        auxiliary_id: fields[2].to_owned(),
    })
}

pub fn encode(token: &CheckInToken) -> String {
    token.to_string()
}

impl FromStr for CheckInToken {
    type Err = CheckInError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}

impl fmt::Display for CheckInToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}",
            SCHEME, SEPARATOR, self.secret, SEPARATOR, self.auxiliary_id
        )
    }
}
