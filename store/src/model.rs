/// Informational only — nothing in the handshake path branches on this.
/// Carried through so a future authorization layer has somewhere to read
/// it from without another round trip to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    Unverified,
    User,
    Op,
    Master,
    Owner,
}

impl AccessLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessLevel::Unverified => "UNVERIFIED",
            AccessLevel::User => "USER",
            AccessLevel::Op => "OP",
            AccessLevel::Master => "MASTER",
            AccessLevel::Owner => "OWNER",
        }
    }
}

impl std::str::FromStr for AccessLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNVERIFIED" => Ok(AccessLevel::Unverified),
            "USER" => Ok(AccessLevel::User),
            "OP" => Ok(AccessLevel::Op),
            "MASTER" => Ok(AccessLevel::Master),
            "OWNER" => Ok(AccessLevel::Owner),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub username: String,
    pub email: String,
    pub salt: Vec<u8>,
    pub verifier: Vec<u8>,
    pub access_level: AccessLevel,
}
