//! Content-based scoring: weighted cosine similarity between the anchor's
//! attribute vector and each candidate's.

use crate::domain::config::RecommendationConfig;
use crate::domain::interaction::CandidatePool;
use crate::domain::product::{ProductAttributes, ProductId};

/// Sparse feature vector over (dimension, weight) pairs. Dimensions are
/// string keys so categorical attributes compare by exact match.
fn feature_vector(attributes: &ProductAttributes, config: &RecommendationConfig) -> Vec<(String, f64)> {
    let weights = &config.weights;
    // All-zero per-dimension weights fall back to an unweighted vector.
    let (price_w, category_w, custom_w) =
        if weights.price + weights.category + weights.custom > 0.0 {
            (weights.price, weights.category, weights.custom)
        } else {
            (1.0, 1.0, 1.0)
        };

    let mut features = Vec::new();
    if category_w > 0.0 {
        features.push((format!("category:{}", attributes.category), category_w));
    }
    if price_w > 0.0 {
        features.push((format!("price_bucket:{}", attributes.price_bucket()), price_w));
    }
    if custom_w > 0.0 {
        if let Some(brand) = &attributes.brand {
            features.push((format!("brand:{brand}"), custom_w));
        }
        for tag in &attributes.tags {
            features.push((format!("tag:{tag}"), custom_w));
        }
    }
    features
}

fn cosine(a: &[(String, f64)], b: &[(String, f64)]) -> f64 {
    let norm =
        |v: &[(String, f64)]| v.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    let (norm_a, norm_b) = (norm(a), norm(b));
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let mut dot = 0.0;
    for (dim, weight_a) in a {
        if let Some((_, weight_b)) = b.iter().find(|(other, _)| other == dim) {
            dot += weight_a * weight_b;
        }
    }
    dot / (norm_a * norm_b)
}

pub(super) fn score(config: &RecommendationConfig, pool: &CandidatePool) -> Vec<(ProductId, f64)> {
    let Some(anchor) = &pool.anchor_attributes else {
        // No anchor (or a since-deleted one): nothing to compare against.
        return Vec::new();
    };
    let anchor_vector = feature_vector(anchor, config);

    pool.candidates
        .iter()
        .map(|(product_id, attributes)| {
            let candidate_vector = feature_vector(attributes, config);
            (product_id.clone(), cosine(&anchor_vector, &candidate_vector))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::context::{Context, PageType, Subject};
    use crate::domain::config::AlgorithmKind;
    use crate::domain::interaction::CandidatePool;
    use crate::domain::product::{ProductAttributes, ProductId};
    use crate::strategy::tests::test_config;
    use crate::strategy::score;

    fn attrs(category: &str, brand: &str, price: f64, tags: &[&str]) -> ProductAttributes {
        ProductAttributes {
            category: category.to_owned(),
            brand: Some(brand.to_owned()),
            price,
            rating: None,
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            product_line: None,
        }
    }

    #[test]
    fn identical_attributes_score_highest() {
        let anchor = attrs("camera", "lumix", 450.0, &["mirrorless"]);
        let mut candidates = BTreeMap::new();
        candidates.insert(ProductId("twin".into()), anchor.clone());
        candidates.insert(ProductId("other_cat".into()), attrs("tripod", "lumix", 450.0, &[]));
        candidates.insert(ProductId("far".into()), attrs("bag", "nomad", 12.0, &["fabric"]));

        let pool = CandidatePool { anchor_attributes: Some(anchor), candidates, interactions: vec![] };
        let context = Context::new(Subject::User("u".into()), PageType::Product, "en")
            .with_anchor(ProductId("anchor".into()));

        let ranked = score(&context, &test_config(AlgorithmKind::ContentBased), &pool);
        assert_eq!(ranked[0].0 .0, "twin");
        assert!((ranked[0].1 - 1.0).abs() < 1e-9);
        let far = ranked.iter().find(|(id, _)| id.0 == "far");
        assert!(far.is_none() || far.unwrap().1 < ranked[0].1);
    }

    #[test]
    fn category_weight_drives_the_comparison_when_dominant() {
        let anchor = attrs("camera", "lumix", 450.0, &[]);
        let mut candidates = BTreeMap::new();
        // Same category, different everything else.
        candidates.insert(ProductId("same_cat".into()), attrs("camera", "nomad", 20.0, &[]));
        // Same brand and price, different category.
        candidates.insert(ProductId("same_brand".into()), attrs("bag", "lumix", 450.0, &[]));

        let pool = CandidatePool { anchor_attributes: Some(anchor), candidates, interactions: vec![] };
        let context = Context::new(Subject::User("u".into()), PageType::Product, "en")
            .with_anchor(ProductId("anchor".into()));

        let mut config = test_config(AlgorithmKind::Similarity);
        config.weights.category = 5.0;
        config.weights.price = 0.5;
        config.weights.custom = 0.5;

        let ranked = score(&context, &config, &pool);
        assert_eq!(ranked[0].0 .0, "same_cat");
    }

    #[test]
    fn missing_anchor_yields_empty_list() {
        let mut candidates = BTreeMap::new();
        candidates.insert(ProductId("p".into()), attrs("camera", "lumix", 10.0, &[]));
        let pool = CandidatePool { anchor_attributes: None, candidates, interactions: vec![] };
        let context = Context::new(Subject::Session("anon".into()), PageType::Home, "en");

        assert!(score(&context, &test_config(AlgorithmKind::ContentBased), &pool).is_empty());
    }
}
