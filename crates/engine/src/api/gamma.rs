//! Gamma market metadata: only the fields needed to categorize a market

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GammaTag {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GammaEvent {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<GammaTag>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GammaMarket {
    #[serde(default, alias = "conditionId")]
    pub condition_id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<GammaTag>>,
    #[serde(default)]
    pub events: Vec<GammaEvent>,
}

impl GammaMarket {
    /// Every category / tag label attached to the market or its events
    pub fn tag_labels(&self) -> Vec<String> {
        let mut labels = Vec::new();
        labels.extend(self.category.iter().cloned());
        push_tags(&mut labels, self.tags.as_deref());
        for event in &self.events {
            labels.extend(event.category.iter().cloned());
            push_tags(&mut labels, event.tags.as_deref());
        }
        labels
    }
}

fn push_tags(labels: &mut Vec<String>, tags: Option<&[GammaTag]>) {
    for tag in tags.unwrap_or_default() {
        labels.extend(tag.label.iter().cloned());
        labels.extend(tag.slug.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_labels_collects_market_and_event_tags() {
        let json = r#"{
            "conditionId": "0xcond",
            "category": "US-current-affairs",
            "tags": [{"label": "Politics", "slug": "politics"}],
            "events": [{"slug": "us-election", "tags": [{"label": "Elections"}]}]
        }"#;
        let market: GammaMarket = serde_json::from_str(json).unwrap();
        assert_eq!(
            market.tag_labels(),
            vec!["US-current-affairs", "Politics", "politics", "Elections"]
        );
    }

    #[test]
    fn test_tag_labels_empty_market() {
        let market: GammaMarket = serde_json::from_str("{}").unwrap();
        assert!(market.tag_labels().is_empty());
    }
}
