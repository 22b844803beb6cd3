use super::RecipientKey;

/// First eight hex characters of the identity tag.
pub fn short_fingerprint(recipient: &RecipientKey) -> String {
    hex::encode(&recipient.tag().as_bytes()[..4])
}
