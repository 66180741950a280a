use gdal::vector::LayerAccess;
use serde::{Deserialize, Serialize};
use snafu::OptionExt;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::error;
use crate::util::Result;
use crate::util::gdal::open_vector;

/// Features with an unset attribute are counted under this key.
pub const NULL_VALUE_KEY: &str = "NULL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureCount {
    Total(u64),
    /// Number of features per attribute value.
    ByValue(BTreeMap<String, u64>),
}

/// Counts the features of the first layer of the vector file at `input`, grouped by the
/// values of `attribute` if one is given.
///
/// Features whose attribute is unset are not dropped but counted under
/// [`NULL_VALUE_KEY`].
pub fn count_features(input: &Path, attribute: Option<&str>) -> Result<FeatureCount> {
    let dataset = open_vector(input)?;
    let mut layer = dataset.layer(0)?;

    let Some(attribute) = attribute else {
        let count = layer.feature_count();
        info!("Total number of features: {count}");
        return Ok(FeatureCount::Total(count));
    };

    let field_index = layer
        .defn()
        .fields()
        .position(|field| field.name() == attribute)
        .context(error::AttributeNotFound {
            attribute,
            path: input,
        })?;

    let mut counts = BTreeMap::<String, u64>::new();
    for feature in layer.features() {
        let value = feature
            .field_as_string(field_index)?
            .unwrap_or_else(|| NULL_VALUE_KEY.to_string());
        *counts.entry(value).or_default() += 1;
    }

    info!("Number of features per '{attribute}':");
    for (value, count) in &counts {
        info!("  Value '{value}': {count} features");
    }

    Ok(FeatureCount::ByValue(counts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::util::test::{point_feature, write_geojson};
    use serde_json::json;
    use std::path::PathBuf;

    fn points(dir: &Path) -> PathBuf {
        write_geojson(
            &dir.join("points.geojson"),
            4326,
            vec![
                point_feature(1.0, 1.0, json!({"crop": "wheat", "class": 1})),
                point_feature(2.0, 1.0, json!({"crop": "maize", "class": 2})),
                point_feature(3.0, 1.0, json!({"crop": "wheat", "class": 1})),
                point_feature(4.0, 1.0, json!({"crop": null, "class": 1})),
            ],
        )
    }

    #[test]
    fn it_counts_all_features() {
        let dir = tempfile::tempdir().unwrap();

        assert_eq!(
            count_features(&points(dir.path()), None).unwrap(),
            FeatureCount::Total(4)
        );
    }

    #[test]
    fn it_groups_by_attribute() {
        let dir = tempfile::tempdir().unwrap();
        let input = points(dir.path());

        let FeatureCount::ByValue(by_crop) = count_features(&input, Some("crop")).unwrap() else {
            panic!("expected counts per value");
        };
        assert_eq!(
            by_crop,
            BTreeMap::from([
                ("NULL".to_string(), 1),
                ("maize".to_string(), 1),
                ("wheat".to_string(), 2),
            ])
        );

        assert_eq!(
            count_features(&input, Some("class")).unwrap(),
            FeatureCount::ByValue(BTreeMap::from([
                ("1".to_string(), 3),
                ("2".to_string(), 1)
            ]))
        );
    }

    #[test]
    fn unknown_attribute_fails() {
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            count_features(&points(dir.path()), Some("soil")),
            Err(Error::AttributeNotFound { attribute, .. }) if attribute == "soil"
        ));
    }
}
