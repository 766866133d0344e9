//! Persisted operator state in plain form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Corefile, PlainCorefile, PlainZoneFile};

/// Everything kept between invocations.
///
/// `corefile` is what is deployed, `new_corefile` collects pending edits until
/// `update` promotes it. Zone files work the same way: `zonefiles` is edited,
/// `deployed_zonefiles` is what was last pushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredState {
    pub corefile: PlainCorefile,
    pub new_corefile: PlainCorefile,
    #[serde(default)]
    pub zonefiles: BTreeMap<String, PlainZoneFile>,
    #[serde(default)]
    pub deployed_zonefiles: BTreeMap<String, PlainZoneFile>,
}

impl StoredState {
    /// Pending edits differ from what was last deployed.
    pub fn has_pending_zonefiles(&self) -> bool {
        self.zonefiles != self.deployed_zonefiles
    }
}

impl Default for StoredState {
    fn default() -> Self {
        let corefile = Corefile::default().to_plain();
        Self {
            new_corefile: corefile.clone(),
            corefile,
            zonefiles: BTreeMap::new(),
            deployed_zonefiles: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ZoneFile;

    #[test]
    fn given_default_state_when_toml_round_trip_then_equal() {
        let mut state = StoredState::default();
        let mut zonefile = ZoneFile::new();
        zonefile.add_record(None, "www", "A", ["10.0.0.1"], true);
        state.zonefiles.insert("example.io".to_string(), zonefile.to_plain());

        let text = toml::to_string_pretty(&state).unwrap();
        let restored: StoredState = toml::from_str(&text).unwrap();

        assert_eq!(restored, state);
        assert_eq!(
            Corefile::from_plain(&restored.corefile).unwrap(),
            Corefile::default()
        );
        assert!(restored.has_pending_zonefiles());
    }
}
