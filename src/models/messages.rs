use serde::{Deserialize, Serialize};
use serde_with::{serde_as, base64::Base64};
use std::sync::Arc;
use utoipa::ToSchema;

/// Inbound request to toggle one bit.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct FlipMessage {
    pub flip: i64,
}

/// Bits that changed since the previous diff cycle, grouped by their new value.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, ToSchema)]
pub struct DiffMessage {
    #[serde(rename = "0", default, skip_serializing_if = "Vec::is_empty")]
    pub zero: Vec<u32>,
    #[serde(rename = "1", default, skip_serializing_if = "Vec::is_empty")]
    pub one: Vec<u32>,
}

impl DiffMessage {
    pub fn is_empty(&self) -> bool {
        self.zero.is_empty() && self.one.is_empty()
    }

    pub fn len(&self) -> usize {
        self.zero.len() + self.one.len()
    }
}

/// The entire bitfield, base64 encoded.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct FullStateMessage {
    #[serde_as(as = "Base64")]
    #[schema(value_type = String, format = Byte)]
    pub state: Vec<u8>,
}

/// Per-session score alongside the global counters.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
pub struct ScoreMessage {
    pub score: i64,
    pub clicks: i64,
    pub hot: i64,
}

/// Serialize an outbound message once so it can be shared between sessions.
pub fn encode<T: Serialize>(msg: &T) -> Arc<str> {
    // Only fixed, well-formed message types reach here
    let text = serde_json::to_string(msg).expect("outbound message must serialize");
    Arc::from(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_omits_empty_directions() {
        let only_ones = DiffMessage { zero: vec![], one: vec![3, 9] };
        assert_eq!(serde_json::to_string(&only_ones).unwrap(), r#"{"1":[3,9]}"#);

        let only_zeros = DiffMessage { zero: vec![7], one: vec![] };
        assert_eq!(serde_json::to_string(&only_zeros).unwrap(), r#"{"0":[7]}"#);

        let both = DiffMessage { zero: vec![1], one: vec![2] };
        assert_eq!(serde_json::to_string(&both).unwrap(), r#"{"0":[1],"1":[2]}"#);
    }

    #[test]
    fn full_state_is_base64() {
        let msg = FullStateMessage { state: vec![0x08, 0x00, 0xff] };
        assert_eq!(&*encode(&msg), r#"{"state":"CAD/"}"#);
    }

    #[test]
    fn score_field_order() {
        let msg = ScoreMessage { score: 2, clicks: 30, hot: 4 };
        assert_eq!(&*encode(&msg), r#"{"score":2,"clicks":30,"hot":4}"#);
    }

    #[test]
    fn flip_parses_and_rejects_garbage() {
        let flip: FlipMessage = serde_json::from_str(r#"{"flip": 1048575}"#).unwrap();
        assert_eq!(flip.flip, 1_048_575);
        let negative: FlipMessage = serde_json::from_str(r#"{"flip": -4}"#).unwrap();
        assert_eq!(negative.flip, -4);
        assert!(serde_json::from_str::<FlipMessage>(r#"{"flip": "3"}"#).is_err());
        assert!(serde_json::from_str::<FlipMessage>("not json").is_err());
    }
}
