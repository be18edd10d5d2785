use crate::construct::Node;
use std::hash::Hasher;
use twox_hash::XxHash64;

/// Path component skipped entirely when computing an id
const HIDDEN_ID: &str = "Default";

/// Path component kept in the hash but hidden from the human-readable part
const HIDDEN_FROM_HUMAN_ID: &str = "Resource";

const HASH_LEN: usize = 8;
const MAX_ID_LEN: usize = 255;
const MAX_HUMAN_LEN: usize = MAX_ID_LEN - HASH_LEN;

/// Logical id of a CFN resource declared at the node
///
/// The stack itself is not a part of the id, so the same construct
/// gets the same logical id in any stack.
pub(crate) fn from_node(node: &Node) -> eyre::Result<String> {
    unique_id(&node.components())
}

/// Build a CFN-compatible id from path components
///
/// A single component is used as is (only alphanumerics kept). Otherwise
/// the components are concatenated and suffixed with a hash of the full path,
/// e.g. ["MyStream", "Resource"] becomes "MyStream" + 8 hex chars.
pub(crate) fn unique_id(components: &[&str]) -> eyre::Result<String> {
    let components: Vec<&str> = components
        .iter()
        .copied()
        .filter(|c| *c != HIDDEN_ID)
        .collect();

    if components.is_empty() {
        eyre::bail!("Unable to calculate a logical id for an empty set of components");
    }

    if components.len() == 1 {
        let candidate = remove_non_alphanumeric(components[0]);

        if candidate.is_empty() {
            eyre::bail!("Id {:?} has no alphanumeric characters", components[0]);
        }

        if candidate.len() <= MAX_ID_LEN {
            return Ok(candidate);
        }
    }

    let hash = path_hash(&components);

    let mut human: String = remove_dupes(&components)
        .into_iter()
        .filter(|c| *c != HIDDEN_FROM_HUMAN_ID)
        .map(remove_non_alphanumeric)
        .collect();

    // Only ASCII is left at this point, so byte truncation is safe
    human.truncate(MAX_HUMAN_LEN);

    Ok(format!("{human}{hash}"))
}

/// Uppercase hex digest of the joined path, shortened to HASH_LEN
fn path_hash(components: &[&str]) -> String {
    let mut hasher = XxHash64::default();
    hasher.write(components.join("/").as_bytes());
    let digest = format!("{:016X}", hasher.finish());
    digest[..HASH_LEN].to_string()
}

/// Drop consecutive duplicates, e.g. ["Key", "Key", "Resource"] -> ["Key", "Resource"]
fn remove_dupes<'a>(components: &[&'a str]) -> Vec<&'a str> {
    let mut result: Vec<&str> = Vec::with_capacity(components.len());

    for component in components.iter().copied() {
        if result.last() != Some(&component) {
            result.push(component);
        }
    }

    result
}

fn remove_non_alphanumeric(value: &str) -> String {
    value.chars().filter(char::is_ascii_alphanumeric).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_keep_single_component_as_is() {
        assert_eq!(unique_id(&["MyStream"]).unwrap(), "MyStream");
        assert_eq!(unique_id(&["My-Stream_1"]).unwrap(), "MyStream1");
    }

    #[test]
    fn test_should_skip_default_component() {
        assert_eq!(unique_id(&["Bucket", "Default"]).unwrap(), "Bucket");
    }

    #[test]
    fn test_should_hash_nested_components() {
        let id = unique_id(&["MyStream", "Resource"]).unwrap();

        assert!(id.starts_with("MyStream"));
        assert_eq!(id.len(), "MyStream".len() + HASH_LEN);
        assert!(id["MyStream".len()..]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_should_be_deterministic() {
        let first = unique_id(&["KinesisEncryptionKey", "Resource"]).unwrap();
        let second = unique_id(&["KinesisEncryptionKey", "Resource"]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_should_differ_for_different_paths() {
        let stream = unique_id(&["MyStream", "Resource"]).unwrap();
        let key = unique_id(&["MyStream", "Key", "Resource"]).unwrap();

        assert!(key.starts_with("MyStreamKey"));
        assert_ne!(stream["MyStream".len()..], key["MyStreamKey".len()..]);
    }

    #[test]
    fn test_should_remove_consecutive_duplicates_from_human_part() {
        let id = unique_id(&["Key", "Key", "Resource"]).unwrap();
        assert!(id.starts_with("Key"));
        assert_eq!(id.len(), "Key".len() + HASH_LEN);
    }

    #[test]
    fn test_should_cap_length() {
        let long = "a".repeat(300);
        let id = unique_id(&[long.as_str(), "Resource"]).unwrap();
        assert_eq!(id.len(), MAX_ID_LEN);

        let id = unique_id(&[long.as_str()]).unwrap();
        assert_eq!(id.len(), MAX_ID_LEN);
    }

    #[test]
    fn test_should_reject_empty_components() {
        assert!(unique_id(&[]).is_err());
        assert!(unique_id(&["Default"]).is_err());
        assert!(unique_id(&["--"]).is_err());
    }
}
