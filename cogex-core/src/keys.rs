use serde::{Deserialize, Serialize};

const ALL_KEYS: &str = "ALL_KEYS";
const NO_KEYS: &str = "NO_KEYS";

/// Keys a listener will accept
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "ChoicesRepr", into = "ChoicesRepr")]
pub enum Choices {
    #[default]
    All,
    None,
    Keys(Vec<String>),
}

impl Choices {
    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Choices::Keys(keys.into_iter().map(Into::into).collect())
    }

    /// Whether `key` is accepted under `policy`
    pub fn accepts(&self, key: &str, policy: &KeyPolicy) -> bool {
        match self {
            Choices::All => true,
            Choices::None => false,
            Choices::Keys(keys) => keys.iter().any(|k| policy.matches(k, key)),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ChoicesRepr {
    Named(String),
    Keys(Vec<String>),
}

impl TryFrom<ChoicesRepr> for Choices {
    type Error = String;

    fn try_from(repr: ChoicesRepr) -> Result<Self, Self::Error> {
        match repr {
            ChoicesRepr::Named(name) if name == ALL_KEYS => Ok(Choices::All),
            ChoicesRepr::Named(name) if name == NO_KEYS => Ok(Choices::None),
            ChoicesRepr::Named(name) => Err(format!(
                "choices must be {ALL_KEYS}, {NO_KEYS} or a list of keys, got {name:?}"
            )),
            ChoicesRepr::Keys(keys) => Ok(Choices::Keys(keys)),
        }
    }
}

impl From<Choices> for ChoicesRepr {
    fn from(choices: Choices) -> Self {
        match choices {
            Choices::All => ChoicesRepr::Named(ALL_KEYS.to_string()),
            Choices::None => ChoicesRepr::Named(NO_KEYS.to_string()),
            Choices::Keys(keys) => ChoicesRepr::Keys(keys),
        }
    }
}

/// How the host compares an expected key with an observed one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyPolicy {
    pub case_sensitive: bool,
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self {
            case_sensitive: true,
        }
    }
}

impl KeyPolicy {
    pub fn case_insensitive() -> Self {
        Self {
            case_sensitive: false,
        }
    }

    pub fn matches(&self, expected: &str, observed: &str) -> bool {
        if self.case_sensitive {
            expected == observed
        } else {
            expected.to_lowercase() == observed.to_lowercase()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_choices_parse() {
        let all: Choices = serde_json::from_str(r#""ALL_KEYS""#).unwrap();
        let none: Choices = serde_json::from_str(r#""NO_KEYS""#).unwrap();
        let keys: Choices = serde_json::from_str(r#"["f", "j"]"#).unwrap();
        assert_eq!(all, Choices::All);
        assert_eq!(none, Choices::None);
        assert_eq!(keys, Choices::keys(["f", "j"]));
    }

    #[test]
    fn unknown_choice_name_is_rejected() {
        assert!(serde_json::from_str::<Choices>(r#""SOME_KEYS""#).is_err());
    }

    #[test]
    fn default_policy_is_case_sensitive() {
        let policy = KeyPolicy::default();
        assert!(policy.matches("j", "j"));
        assert!(!policy.matches("j", "J"));
        assert!(KeyPolicy::case_insensitive().matches("j", "J"));
    }

    #[test]
    fn listed_choices_follow_policy() {
        let choices = Choices::keys(["f", "j"]);
        assert!(choices.accepts("j", &KeyPolicy::default()));
        assert!(!choices.accepts("k", &KeyPolicy::default()));
        assert!(!choices.accepts("J", &KeyPolicy::default()));
        assert!(choices.accepts("J", &KeyPolicy::case_insensitive()));
        assert!(!Choices::None.accepts("j", &KeyPolicy::default()));
        assert!(Choices::All.accepts("anything", &KeyPolicy::default()));
    }
}
