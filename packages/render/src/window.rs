//! View windows and the per-region scale maximum.
//!
//! A [`ViewRegion`]'s `xlim`/`ylim` are longitude/latitude limits. They are
//! projected the same way as the boundary table so the window and the
//! geometry share coordinates. Only areas lying wholly inside the window
//! set the region's scale.

use chrono::NaiveDate;
use covid_map_cases::CaseTable;
use covid_map_geography::{BoundaryTable, GeoError, projection::Projector};
use covid_map_geography_models::ViewRegion;
use geo::{Contains as _, Coord, Rect};

/// The region's window in the boundary table's projection.
///
/// # Errors
///
/// Returns [`GeoError::Projection`] if a corner cannot be projected.
pub fn window_rect(region: &ViewRegion, projector: &dyn Projector) -> Result<Rect<f64>, GeoError> {
    let min = projector.project_coord(Coord {
        x: region.xlim[0],
        y: region.ylim[0],
    })?;
    let max = projector.project_coord(Coord {
        x: region.xlim[1],
        y: region.ylim[1],
    })?;
    Ok(Rect::new(min, max))
}

/// Keys of the boundary rows lying wholly inside `window`.
///
/// Large neighbours that only clip an edge are drawn but do not count, so
/// they cannot stretch the scale of a small window.
#[must_use]
pub fn keys_in_window<'a>(boundaries: &'a BoundaryTable, window: &Rect<f64>) -> Vec<&'a str> {
    boundaries
        .iter()
        .filter(|(_, record)| window.contains(&record.geometry))
        .map(|(key, _)| key)
        .collect()
}

/// Largest case value among areas in `window` over `dates`.
///
/// `None` when no area in the window has a value on any of the dates.
#[must_use]
pub fn find_max_in_region(
    boundaries: &BoundaryTable,
    cases: &CaseTable,
    window: &Rect<f64>,
    dates: &[NaiveDate],
) -> Option<u64> {
    cases.max_over(keys_in_window(boundaries, window), dates)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use covid_map_geography::{
        BoundaryRecord, projection::Projection, reconcile::RegionReconciler,
    };
    use covid_map_geography_models::KeyField;
    use geo::{MultiPolygon, polygon};

    pub(crate) fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, day).unwrap()
    }

    fn square(name: &str, code: &str, x: f64, y: f64, size: f64) -> BoundaryRecord {
        BoundaryRecord {
            name: name.to_string(),
            code: code.to_string(),
            geometry: MultiPolygon::new(vec![polygon![
                (x: x, y: y),
                (x: x + size, y: y),
                (x: x + size, y: y + size),
                (x: x, y: y + size),
                (x: x, y: y),
            ]]),
        }
    }

    fn record(name: &str, code: &str, x: f64, y: f64) -> BoundaryRecord {
        square(name, code, x, y, 0.2)
    }

    fn records() -> Vec<BoundaryRecord> {
        vec![
            record("Wirral", "E08000015", -3.2, 53.3),
            record("Sefton", "E08000014", -3.1, 53.5),
            record("Cardiff", "W06000015", -3.3, 51.4),
            record("Camden", "E09000007", -0.2, 51.5),
        ]
    }

    pub(crate) fn boundaries_in(projection: &Projection) -> BoundaryTable {
        RegionReconciler::new(KeyField::Name, Vec::new(), Vec::new())
            .unwrap()
            .reconcile(records(), projection)
            .unwrap()
    }

    pub(crate) fn boundaries() -> BoundaryTable {
        boundaries_in(&Projection::Wgs84)
    }

    fn london() -> ViewRegion {
        ViewRegion {
            name: "London".to_string(),
            title: None,
            xlim: [-0.6, 0.5],
            ylim: [51.3, 51.7],
            date_loc: None,
            countries: vec!["England".to_string()],
        }
    }

    pub(crate) fn north_west() -> ViewRegion {
        ViewRegion {
            name: "NW".to_string(),
            title: None,
            xlim: [-3.4, -1.9],
            ylim: [52.8, 53.9],
            date_loc: Some([-3.35, 53.8]),
            countries: vec!["England".to_string()],
        }
    }

    #[test]
    fn selects_areas_inside_window() {
        let table = boundaries();
        let window = window_rect(&north_west(), &Projection::Wgs84).unwrap();
        assert_eq!(keys_in_window(&table, &window), vec!["Sefton", "Wirral"]);
    }

    #[test]
    fn neighbour_clipping_a_corner_does_not_set_the_max() {
        let table = RegionReconciler::new(KeyField::Name, Vec::new(), Vec::new())
            .unwrap()
            .reconcile(
                vec![
                    square("Camden", "E09000007", -0.2, 51.5, 0.1),
                    // Overlaps only the south-east corner of the window.
                    square("Kent", "E10000016", 0.3, 50.9, 1.2),
                ],
                &Projection::Wgs84,
            )
            .unwrap();
        let mut cases = CaseTable::new();
        cases.insert("Camden", d(20), 100);
        cases.insert("Kent", d(20), 5000);

        let window = window_rect(&london(), &Projection::Wgs84).unwrap();
        assert_eq!(keys_in_window(&table, &window), vec!["Camden"]);
        assert_eq!(
            find_max_in_region(&table, &cases, &window, &[d(20)]),
            Some(100)
        );
    }

    #[test]
    fn max_uses_only_inside_areas_and_dates() {
        let table = boundaries();
        let mut cases = CaseTable::new();
        cases.insert("Wirral", d(20), 12);
        cases.insert("Wirral", d(22), 30);
        cases.insert("Sefton", d(21), 18);
        cases.insert("Camden", d(21), 500);

        let window = window_rect(&north_west(), &Projection::Wgs84).unwrap();
        assert_eq!(
            find_max_in_region(&table, &cases, &window, &[d(20), d(21)]),
            Some(18)
        );
        assert_eq!(
            find_max_in_region(&table, &cases, &window, &[d(20), d(21), d(22)]),
            Some(30)
        );
        assert_eq!(find_max_in_region(&table, &cases, &window, &[d(1)]), None);
    }

    #[test]
    fn window_follows_projection() {
        let window = window_rect(&north_west(), &Projection::WebMercator).unwrap();
        // Projected metres, not degrees.
        assert!(window.min().x < -300_000.0 && window.min().x > -400_000.0);
        assert!(window.max().y > 7_000_000.0);
    }
}
