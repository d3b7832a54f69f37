//! Metadata records produced per resolved content identifier.

use serde::{Deserialize, Serialize};

/// Durable artifact produced for one CID.
///
/// `id` is always the CID itself; whatever id the fetched body claims is
/// ignored. Persisted with upsert semantics so a whole-batch retry simply
/// overwrites earlier successes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub id: String,
    pub name: String,
    pub image: String,
    pub description: String,
}

/// Wire shape of a gateway response body.
///
/// The gateway serves PascalCase keys; missing fields decode to empty
/// strings rather than failing the whole record.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetadataBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
}

impl MetadataBody {
    /// Stamp the decoded body with the CID it was fetched for.
    pub fn into_metadata(self, cid: &str) -> Metadata {
        Metadata {
            id: cid.to_string(),
            name: self.name,
            image: self.image,
            description: self.description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_decodes_pascal_case_and_stamps_cid() {
        let body: MetadataBody = serde_json::from_str(
            r#"{"Name":"token","Image":"ipfs://img","Description":"d","ID":"bogus"}"#,
        )
        .unwrap();
        let metadata = body.into_metadata("Qm1");
        assert_eq!(metadata.id, "Qm1");
        assert_eq!(metadata.name, "token");
    }

    #[test]
    fn missing_fields_decode_to_empty() {
        let body: MetadataBody = serde_json::from_str("{}").unwrap();
        let metadata = body.into_metadata("Qm1");
        assert_eq!(metadata.name, "");
        assert_eq!(metadata.description, "");
    }
}
