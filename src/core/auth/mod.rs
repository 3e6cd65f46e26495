use serde::{Deserialize, Serialize};

const OFFLINE_UUID: &str = "00000000-0000-0000-0000-000000000000";
const OFFLINE_ACCESS_TOKEN: &str = "0";

/// Identity passed to the game. Obtaining real credentials happens elsewhere;
/// the engine only substitutes these values into the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub username: String,
    pub uuid: String,
    pub access_token: String,
    pub user_type: String,
    #[serde(default)]
    pub xuid: String,
    #[serde(default)]
    pub client_id: String,
}

impl Default for PlayerInfo {
    fn default() -> Self {
        Self::offline("Player")
    }
}

impl PlayerInfo {
    pub fn offline(username: &str) -> Self {
        Self {
            username: username.trim().to_string(),
            uuid: OFFLINE_UUID.into(),
            access_token: OFFLINE_ACCESS_TOKEN.into(),
            user_type: "legacy".into(),
            xuid: String::new(),
            client_id: String::new(),
        }
    }

    /// Fill blank fields so no placeholder renders as an empty argument.
    pub fn sanitized(mut self) -> Self {
        if self.username.trim().is_empty() {
            self.username = "Player".into();
        }
        if self.uuid.trim().is_empty() {
            self.uuid = OFFLINE_UUID.into();
        }
        if self.access_token.trim().is_empty() {
            self.access_token = OFFLINE_ACCESS_TOKEN.into();
        }
        if self.user_type.trim().is_empty() {
            self.user_type = "legacy".into();
        }
        if self.xuid.trim().is_empty() {
            self.xuid = "0".into();
        }
        if self.client_id.trim().is_empty() {
            self.client_id = "0".into();
        }
        self
    }

    /// UUID without dashes, as the game expects it.
    pub fn uuid_simple(&self) -> String {
        self.uuid.replace('-', "")
    }
}
