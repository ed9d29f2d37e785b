//! Named label policies. A dataset picks exactly one; nothing here is inferred
//! from file contents.
//!
//! The rating policies are not interchangeable: `strict_10pt` throws away the
//! ambiguous 4 and 7 ratings while `lenient_10pt` buckets every rating.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::example::Label;

pub const SENTIMENT_LABELS: [&str; 3] = ["negative", "neutral", "positive"];
pub const BINARY_LABELS: [&str; 2] = ["negative", "positive"];

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind")]
pub enum LabelPolicy {
    /// 1-3 negative, 5-6 neutral, 8-10 positive; 4 and 7 dropped.
    #[serde(rename = "strict_10pt")]
    Strict10pt,
    /// 1-4 negative, 5-6 neutral, 7-10 positive.
    #[serde(rename = "lenient_10pt")]
    Lenient10pt,
    /// 1-2 negative, 3 neutral, 4-5 positive.
    #[serde(rename = "five_point", alias = "5pt")]
    FivePoint,
    /// 0 negative, 1 positive.
    #[serde(rename = "binary_01")]
    Binary01,
    /// sentiment words, or class codes 0/1/2
    #[serde(rename = "sentiment_3")]
    Sentiment3,
    #[serde(rename = "categorical")]
    Categorical { labels: Vec<String> },
}

impl LabelPolicy {
    /// Policies that need no extra parameters, addressable by name from the CLI.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "strict_10pt" => Some(Self::Strict10pt),
            "lenient_10pt" => Some(Self::Lenient10pt),
            "five_point" | "5pt" => Some(Self::FivePoint),
            "binary_01" => Some(Self::Binary01),
            "sentiment_3" => Some(Self::Sentiment3),
            _ => None,
        }
    }

    /// Stable, versioned identifier printed in run summaries.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Strict10pt => "strict_10pt@v1",
            Self::Lenient10pt => "lenient_10pt@v1",
            Self::FivePoint => "five_point@v1",
            Self::Binary01 => "binary_01@v1",
            Self::Sentiment3 => "sentiment_3@v1",
            Self::Categorical { .. } => "categorical@v1",
        }
    }

    /// Canonical names in class-id order.
    pub fn labels(&self) -> Vec<&str> {
        match self {
            Self::Binary01 => BINARY_LABELS.to_vec(),
            Self::Categorical { labels } => labels.iter().map(String::as_str).collect(),
            _ => SENTIMENT_LABELS.to_vec(),
        }
    }

    /// `{"negative": 0, "neutral": 1, ...}` as read by the finetuning scripts.
    pub fn id_map(&self) -> LabelIdMap<'_> {
        LabelIdMap(self.labels())
    }

    pub fn validate(&self) -> Result<()> {
        if let Self::Categorical { labels } = self {
            if labels.is_empty() {
                return Err(PipelineError::Config(
                    "categorical policy needs at least one label".into(),
                ));
            }
            let mut seen = std::collections::HashSet::new();
            for l in labels {
                if !seen.insert(l.to_lowercase()) {
                    return Err(PipelineError::Config(format!(
                        "categorical label {l:?} declared twice"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Map a raw label onto a canonical name. `None` means drop the record.
    pub fn map_name(&self, raw: &Value) -> Option<&str> {
        match self {
            Self::Strict10pt => match integral(raw)? {
                1..=3 => Some("negative"),
                5 | 6 => Some("neutral"),
                8..=10 => Some("positive"),
                _ => None,
            },
            Self::Lenient10pt => {
                let r = rating(raw)?;
                if !(1.0..=10.0).contains(&r) {
                    None
                } else if r <= 4.0 {
                    Some("negative")
                } else if r <= 6.0 {
                    Some("neutral")
                } else {
                    Some("positive")
                }
            }
            Self::FivePoint => match integral(raw)? {
                1 | 2 => Some("negative"),
                3 => Some("neutral"),
                4 | 5 => Some("positive"),
                _ => None,
            },
            Self::Binary01 => match integral(raw)? {
                0 => Some("negative"),
                1 => Some("positive"),
                _ => None,
            },
            Self::Sentiment3 => {
                if let Some(code) = integral(raw) {
                    return usize::try_from(code)
                        .ok()
                        .and_then(|i| SENTIMENT_LABELS.get(i).copied());
                }
                let word = raw.as_str()?.trim().to_lowercase();
                SENTIMENT_LABELS.iter().copied().find(|l| *l == word)
            }
            Self::Categorical { labels } => {
                let word = raw.as_str()?.trim().to_lowercase();
                labels
                    .iter()
                    .find(|l| l.to_lowercase() == word)
                    .map(String::as_str)
            }
        }
    }
}

// ratings show up as JSON numbers or, from CSV, as numeric strings
fn rating(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|r| r.is_finite())
}

fn integral(raw: &Value) -> Option<i64> {
    let r = rating(raw)?;
    (r.fract() == 0.0).then_some(r as i64)
}

/// Name to class id, serialized in taxonomy order.
#[derive(Debug)]
pub struct LabelIdMap<'a>(Vec<&'a str>);

impl Serialize for LabelIdMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().enumerate().map(|(id, name)| (*name, id)))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelFormat {
    #[default]
    Name,
    Id,
}

/// Policy plus output shape, ready to label records.
#[derive(Clone, Debug)]
pub struct LabelMapper {
    policy: LabelPolicy,
    format: LabelFormat,
}

impl LabelMapper {
    pub fn new(policy: LabelPolicy, format: LabelFormat) -> Result<Self> {
        policy.validate()?;
        Ok(Self { policy, format })
    }

    pub fn policy(&self) -> &LabelPolicy {
        &self.policy
    }

    pub fn map(&self, raw: &Value) -> Option<Label> {
        let name = self.policy.map_name(raw)?;
        match self.format {
            LabelFormat::Name => Some(Label::Name(name.to_string())),
            LabelFormat::Id => self
                .policy
                .labels()
                .iter()
                .position(|l| *l == name)
                .map(|i| Label::Id(i as i64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strict_10pt_drops_the_ambiguous_band() {
        let p = LabelPolicy::Strict10pt;
        for r in 1..=3 {
            assert_eq!(p.map_name(&json!(r)), Some("negative"));
        }
        for r in 5..=6 {
            assert_eq!(p.map_name(&json!(r)), Some("neutral"));
        }
        for r in 8..=10 {
            assert_eq!(p.map_name(&json!(r)), Some("positive"));
        }
        assert_eq!(p.map_name(&json!(4)), None);
        assert_eq!(p.map_name(&json!(7)), None);
        assert_eq!(p.map_name(&json!(0)), None);
        assert_eq!(p.map_name(&json!(11)), None);
        assert_eq!(p.map_name(&json!(8.5)), None);
        assert_eq!(p.map_name(&json!("9")), Some("positive"));
        assert_eq!(p.map_name(&json!("9.0")), Some("positive"));
    }

    #[test]
    fn lenient_10pt_buckets_every_rating() {
        let p = LabelPolicy::Lenient10pt;
        let got: Vec<_> = (1..=10).map(|r| p.map_name(&json!(r)).unwrap()).collect();
        assert_eq!(
            got,
            [
                "negative", "negative", "negative", "negative", "neutral", "neutral", "positive",
                "positive", "positive", "positive"
            ]
        );
        assert_eq!(p.map_name(&json!(6.5)), Some("positive"));
        assert_eq!(p.map_name(&json!(0.5)), None);
        assert_eq!(p.map_name(&json!("n/a")), None);
    }

    #[test]
    fn five_point_has_no_drop_band() {
        let p = LabelPolicy::FivePoint;
        let got: Vec<_> = (1..=5).map(|r| p.map_name(&json!(r))).collect();
        assert_eq!(
            got,
            [Some("negative"), Some("negative"), Some("neutral"), Some("positive"), Some("positive")]
        );
        assert_eq!(p.map_name(&json!(6)), None);
    }

    #[test]
    fn sentiment_words_and_codes() {
        let p = LabelPolicy::Sentiment3;
        assert_eq!(p.map_name(&json!(" Positive ")), Some("positive"));
        assert_eq!(p.map_name(&json!(0)), Some("negative"));
        assert_eq!(p.map_name(&json!(2)), Some("positive"));
        assert_eq!(p.map_name(&json!(3)), None);
        assert_eq!(p.map_name(&json!("mixed")), None);
        assert_eq!(p.map_name(&json!(true)), None);
    }

    #[test]
    fn categorical_matches_declared_names_only() {
        let p = LabelPolicy::Categorical {
            labels: vec!["Anatomy".into(), "Pharmacology".into()],
        };
        assert_eq!(p.map_name(&json!("anatomy")), Some("Anatomy"));
        assert_eq!(p.map_name(&json!("Surgery")), None);
        assert!(LabelPolicy::Categorical { labels: vec![] }.validate().is_err());
    }

    #[test]
    fn id_format_uses_taxonomy_position() {
        let m = LabelMapper::new(LabelPolicy::Sentiment3, LabelFormat::Id).unwrap();
        assert_eq!(m.map(&json!("neutral")), Some(Label::Id(1)));
        let b = LabelMapper::new(LabelPolicy::Binary01, LabelFormat::Id).unwrap();
        assert_eq!(b.map(&json!(1)), Some(Label::Id(1)));
        let n = LabelMapper::new(LabelPolicy::Strict10pt, LabelFormat::Name).unwrap();
        assert_eq!(n.map(&json!(2)), Some(Label::Name("negative".into())));
    }

    #[test]
    fn parses_from_descriptor_json() {
        let p: LabelPolicy = serde_json::from_value(json!({"kind": "strict_10pt"})).unwrap();
        assert_eq!(p, LabelPolicy::Strict10pt);
        let c: LabelPolicy =
            serde_json::from_value(json!({"kind": "categorical", "labels": ["a", "b"]})).unwrap();
        assert_eq!(c.labels(), vec!["a", "b"]);
        assert_eq!(LabelPolicy::from_name("five_point"), Some(LabelPolicy::FivePoint));
        let alias: LabelPolicy = serde_json::from_value(json!({"kind": "5pt"})).unwrap();
        assert_eq!(alias, LabelPolicy::FivePoint);
    }

    #[test]
    fn id_map_keeps_taxonomy_order() {
        let raw = serde_json::to_string(&LabelPolicy::Sentiment3.id_map()).unwrap();
        assert_eq!(raw, r#"{"negative":0,"neutral":1,"positive":2}"#);
        let c = LabelPolicy::Categorical {
            labels: vec!["zeta".into(), "alpha".into()],
        };
        assert_eq!(serde_json::to_string(&c.id_map()).unwrap(), r#"{"zeta":0,"alpha":1}"#);
    }
}
