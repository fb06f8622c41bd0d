//! Frame rendering.
//!
//! Rasterizing is left to an external tool. [`GeoJsonFrameWriter`] writes
//! each frame as a `FeatureCollection` whose features carry their value,
//! bucket and fill color, with the legend, title, date label and view
//! limits as foreign members, so the rasterizer needs no knowledge of the
//! scale. Limits and the date anchor are written in the same projected
//! coordinates as the feature geometry, with the EPSG code alongside.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use covid_map_classify::ClassificationScale;
use covid_map_geography::{GeoError, projection::Projector};
use covid_map_geography_models::ViewRegion;
use geo::{Coord, Rect};
use serde_json::{Map, Value, json};

use crate::{JoinedFrame, RenderError, window};

/// Per-frame labelling that does not come from the data.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    /// The view region being drawn.
    pub region: &'a ViewRegion,
    /// The region's window in the boundary table's projection.
    pub window: Rect<f64>,
    /// Projected anchor of the date label.
    pub date_loc: Option<Coord<f64>>,
    /// EPSG code of `window`, `date_loc` and the feature geometry.
    pub epsg: u32,
    /// Data attribution line.
    pub attribution: Option<&'a str>,
}

impl<'a> FrameContext<'a> {
    /// Projects the region's limits and date anchor with `projector`, the
    /// one the boundary table was reconciled with.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Projection`] if a limit or the anchor cannot be
    /// projected.
    pub fn new(
        region: &'a ViewRegion,
        projector: &dyn Projector,
        attribution: Option<&'a str>,
    ) -> Result<Self, GeoError> {
        let date_loc = region
            .date_loc
            .map(|[x, y]| projector.project_coord(Coord { x, y }))
            .transpose()?;
        Ok(Self {
            region,
            window: window::window_rect(region, projector)?,
            date_loc,
            epsg: projector.epsg(),
            attribution,
        })
    }
}

/// Turns a joined frame and its scale into an output artifact.
pub trait FrameRenderer {
    /// Renders one frame and returns the path written.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the frame cannot be produced.
    fn render(
        &self,
        frame: &JoinedFrame<'_>,
        scale: &ClassificationScale,
        context: &FrameContext<'_>,
    ) -> Result<PathBuf, RenderError>;
}

/// File stem shared by every frame of a region: `COVID-19_<region>`.
///
/// Spaces and path separators in the region name become `_`.
#[must_use]
pub fn frame_prefix(region: &str) -> String {
    let region: String = region
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    format!("COVID-19_{region}")
}

/// Deterministic frame file stem: `COVID-19_<region>_<YYYY-MM-DD>`, so
/// frames of one region sort by date.
#[must_use]
pub fn frame_file_name(region: &str, date: NaiveDate) -> String {
    format!("{}_{}", frame_prefix(region), date.format("%Y-%m-%d"))
}

/// Writes each frame as a styled `GeoJSON` `FeatureCollection`.
#[derive(Debug, Clone)]
pub struct GeoJsonFrameWriter {
    output_dir: PathBuf,
}

impl GeoJsonFrameWriter {
    /// Writes frames into `output_dir`, creating it on first use.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Builds the frame document without writing it.
    #[must_use]
    pub fn to_feature_collection(
        frame: &JoinedFrame<'_>,
        scale: &ClassificationScale,
        context: &FrameContext<'_>,
    ) -> geojson::FeatureCollection {
        let features = frame
            .rows()
            .iter()
            .map(|row| {
                let bucket = scale.bucket_for(row.value);
                let mut properties = Map::new();
                properties.insert("key".to_string(), row.key.into());
                properties.insert("name".to_string(), row.record.name.clone().into());
                properties.insert("code".to_string(), row.record.code.clone().into());
                properties.insert("value".to_string(), row.value.into());
                properties.insert(
                    "bucket".to_string(),
                    serde_json::to_value(bucket).unwrap_or(Value::Null),
                );
                properties.insert("fill".to_string(), scale.color(bucket).hex().into());
                geojson::Feature {
                    bbox: None,
                    geometry: Some(geojson::Geometry::new(geojson::Value::from(
                        &row.record.geometry,
                    ))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        let region = context.region;
        let mut members = Map::new();
        members.insert("title".to_string(), region.title().into());
        members.insert("region".to_string(), region.name.clone().into());
        members.insert(
            "date".to_string(),
            frame.date().format("%Y-%m-%d").to_string().into(),
        );
        members.insert(
            "date_label".to_string(),
            frame.date().format("%-d %B %Y").to_string().into(),
        );
        members.insert("epsg".to_string(), context.epsg.into());
        members.insert(
            "date_loc".to_string(),
            json!(context.date_loc.map(|c| [c.x, c.y])),
        );
        members.insert(
            "xlim".to_string(),
            json!([context.window.min().x, context.window.max().x]),
        );
        members.insert(
            "ylim".to_string(),
            json!([context.window.min().y, context.window.max().y]),
        );
        members.insert("scale".to_string(), scale.kind().as_ref().into());
        members.insert("ticks".to_string(), json!(scale.ticks()));
        members.insert(
            "legend".to_string(),
            serde_json::to_value(scale.legend()).unwrap_or(Value::Null),
        );
        members.insert(
            "no_data_fill".to_string(),
            scale
                .color(covid_map_classify::Bucket::NoData)
                .hex()
                .into(),
        );
        if let Some(attribution) = context.attribution {
            members.insert("attribution".to_string(), attribution.into());
        }

        geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(members),
        }
    }
}

impl FrameRenderer for GeoJsonFrameWriter {
    fn render(
        &self,
        frame: &JoinedFrame<'_>,
        scale: &ClassificationScale,
        context: &FrameContext<'_>,
    ) -> Result<PathBuf, RenderError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!(
            "{}.geojson",
            frame_file_name(&context.region.name, frame.date())
        ));

        let collection = Self::to_feature_collection(frame, scale, context);
        fs::write(&path, serde_json::to_string(&collection)?)?;
        log::debug!("Wrote {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::tests::{boundaries, boundaries_in, d, north_west};
    use covid_map_cases::CaseTable;
    use covid_map_geography::projection::Projection;

    #[test]
    fn file_names_are_deterministic() {
        assert_eq!(frame_file_name("UK", d(20)), "COVID-19_UK_2020-03-20");
        assert_eq!(
            frame_file_name("North West", d(5)),
            "COVID-19_North_West_2020-03-05"
        );
    }

    #[test]
    fn styles_features_and_labels_frame() {
        let table = boundaries();
        let mut cases = CaseTable::new();
        cases.insert("Wirral", d(20), 3);
        cases.insert("Sefton", d(20), 100);
        let frame = JoinedFrame::build(&table, &cases, d(20));
        let scale = ClassificationScale::logarithmic(5.0, 13);
        let region = north_west();
        let context = FrameContext::new(&region, &Projection::Wgs84, Some("Data: example")).unwrap();

        let fc = GeoJsonFrameWriter::to_feature_collection(&frame, &scale, &context);

        assert_eq!(fc.features.len(), table.len());
        let by_key = |key: &str| {
            fc.features
                .iter()
                .find(|f| f.property("key").and_then(Value::as_str) == Some(key))
                .unwrap()
        };

        let wirral = by_key("Wirral");
        assert_eq!(wirral.property("value"), Some(&json!(3)));
        assert_eq!(
            wirral.property("bucket"),
            Some(&json!({"kind": "class", "index": 2}))
        );
        assert_eq!(
            wirral.property("fill").and_then(Value::as_str),
            Some(scale.colors()[2].hex().as_str())
        );

        let sefton = by_key("Sefton");
        assert_eq!(sefton.property("fill"), Some(&json!("#000000")));

        let cardiff = by_key("Cardiff");
        assert_eq!(cardiff.property("value"), Some(&Value::Null));
        assert_eq!(cardiff.property("fill"), Some(&json!("#d3d3d3")));

        let members = fc.foreign_members.as_ref().unwrap();
        assert_eq!(members["date"], json!("2020-03-20"));
        assert_eq!(members["date_label"], json!("20 March 2020"));
        assert_eq!(members["ticks"], json!([1, 2, 3, 4, 5]));
        assert_eq!(members["attribution"], json!("Data: example"));
        assert_eq!(members["legend"].as_array().unwrap().len(), 6);
        assert_eq!(members["epsg"], json!(4326));
        assert_eq!(members["xlim"], json!([-3.4, -1.9]));
        assert_eq!(members["date_loc"], json!([-3.35, 53.8]));
        assert!(
            members["title"]
                .as_str()
                .unwrap()
                .contains("NW"),
            "title: {}",
            members["title"]
        );
    }

    #[test]
    fn writes_named_file() {
        let tmp = std::env::temp_dir().join("covid_map_render_frame_writer");
        let _ = std::fs::remove_dir_all(&tmp);

        let table = boundaries();
        let cases = CaseTable::new();
        let frame = JoinedFrame::build(&table, &cases, d(21));
        let scale = ClassificationScale::logarithmic(10.0, 11);
        let region = north_west();
        let writer = GeoJsonFrameWriter::new(&tmp);

        let path = writer
            .render(
                &frame,
                &scale,
                &FrameContext::new(&region, &Projection::Wgs84, None).unwrap(),
            )
            .unwrap();

        assert_eq!(path, tmp.join("COVID-19_NW_2020-03-21.geojson"));
        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["type"], json!("FeatureCollection"));
        assert_eq!(written["region"], json!("NW"));
        assert!(written.get("attribution").is_none());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn web_mercator_limits_share_feature_coordinates() {
        let projection = Projection::WebMercator;
        let table = boundaries_in(&projection);
        let mut cases = CaseTable::new();
        cases.insert("Wirral", d(20), 12);
        cases.insert("Sefton", d(20), 40);
        // Outside the window; must not reach the scale.
        cases.insert("Camden", d(20), 900);

        let region = north_west();
        let context = FrameContext::new(&region, &projection, None).unwrap();
        let max = crate::window::find_max_in_region(&table, &cases, &context.window, &[d(20)]);
        assert_eq!(max, Some(40));

        let frame = JoinedFrame::build(&table, &cases, d(20));
        let scale = ClassificationScale::logarithmic(40.0, 13);
        let fc = GeoJsonFrameWriter::to_feature_collection(&frame, &scale, &context);
        let members = fc.foreign_members.as_ref().unwrap();
        assert_eq!(members["epsg"], json!(3857));

        let xlim: Vec<f64> = serde_json::from_value(members["xlim"].clone()).unwrap();
        let ylim: Vec<f64> = serde_json::from_value(members["ylim"].clone()).unwrap();
        let anchor: Vec<f64> = serde_json::from_value(members["date_loc"].clone()).unwrap();
        assert!(xlim[0] < xlim[1] && ylim[0] < ylim[1]);
        assert!(xlim[0] <= anchor[0] && anchor[0] <= xlim[1]);
        assert!(ylim[0] <= anchor[1] && anchor[1] <= ylim[1]);

        // Every vertex of the in-window areas falls inside the written limits.
        let wirral = fc
            .features
            .iter()
            .find(|f| f.property("key").and_then(Value::as_str) == Some("Wirral"))
            .unwrap();
        let geometry = wirral.geometry.as_ref().unwrap();
        let geojson::Value::MultiPolygon(polygons) = &geometry.value else {
            panic!("expected a MultiPolygon, got {:?}", geometry.value);
        };
        for position in polygons.iter().flatten().flatten() {
            assert!(xlim[0] <= position[0] && position[0] <= xlim[1], "x {}", position[0]);
            assert!(ylim[0] <= position[1] && position[1] <= ylim[1], "y {}", position[1]);
        }
    }
}
