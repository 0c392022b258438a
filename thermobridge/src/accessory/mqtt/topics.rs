use crate::accessory::CharacteristicKind;

/// Topic layout of the accessory network.
#[derive(Clone, Debug)]
pub struct Topics {
    accessories:  String,
    availability: String,
}

/// Accessory ids are used as a single topic level.
pub fn topic_id(id: &str) -> String {
    id.replace(|c: char| matches!(c, '/' | '+' | '#'), "_")
}

impl Topics {
    pub fn new(base_topic: &str) -> Self {
        let base = base_topic.trim_end_matches('/');
        Topics {
            accessories:  format!("{}/accessories/", base),
            availability: format!("{}/status", base),
        }
    }

    pub fn availability(&self) -> &str {
        &self.availability
    }

    pub fn config(&self, id: &str) -> String {
        format!("{}{}/config", self.accessories, id)
    }

    pub fn state(&self, id: &str, kind: CharacteristicKind) -> String {
        format!("{}{}/{}", self.accessories, id, kind)
    }

    pub fn command(&self, id: &str, kind: CharacteristicKind) -> Option<String> {
        if kind.writable() {
            Some(format!("{}/set", self.state(id, kind)))
        } else {
            None
        }
    }

    pub fn command_filter(&self, id: &str) -> String {
        format!("{}{}/+/set", self.accessories, id)
    }

    /// Splits `<base>/accessories/<id>/<characteristic>/set` into its parts.
    pub fn parse_command<'a>(&self, topic: &'a str) -> Option<(&'a str, CharacteristicKind)> {
        let rest = topic.strip_prefix(self.accessories.as_str())?;
        let mut parts = rest.split('/');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(id), Some(kind), Some("set"), None) if !id.is_empty() => {
                CharacteristicKind::from_topic(kind).map(|k| (id, k))
            }
            _ => None,
        }
    }
}
