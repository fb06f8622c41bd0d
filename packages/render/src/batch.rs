//! The frame batch loop.
//!
//! For each view region the scale is computed once from the largest value
//! among areas wholly inside its window over the whole date range, then
//! every date is rendered against that scale. A failed frame is logged and
//! counted; the batch always moves on to the next frame.

use std::path::PathBuf;

use chrono::NaiveDate;
use covid_map_cases::CaseTable;
use covid_map_classify::{ClassificationScale, ScaleKind};
use covid_map_geography::{BoundaryTable, projection::Projector};
use covid_map_geography_models::ViewRegion;
use geo::Rect;

use crate::{
    FrameContext, FrameRenderer, JoinedFrame, ProgressCallback, RenderError, frame::frame_prefix,
    window,
};

/// Scale settings shared by every frame of a batch.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Requested bucket count.
    pub buckets: usize,
    /// Floor applied to each region's maximum before building its scale.
    pub min_scale_max: u64,
    /// Tick spacing.
    pub scale_kind: ScaleKind,
    /// Attribution passed to every frame.
    pub attribution: Option<String>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            buckets: 13,
            min_scale_max: 10,
            scale_kind: ScaleKind::Logarithmic,
            attribution: None,
        }
    }
}

impl BatchOptions {
    /// Builds the scale for a region whose in-window maximum is `max`.
    #[must_use]
    pub fn scale_for(&self, max: u64) -> ClassificationScale {
        #[allow(clippy::cast_precision_loss)]
        let maxval = max.max(self.min_scale_max) as f64;
        match self.scale_kind {
            ScaleKind::Logarithmic => ClassificationScale::logarithmic(maxval, self.buckets),
            ScaleKind::Linear => ClassificationScale::linear(maxval, self.buckets),
        }
    }
}

/// A frame that could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFailure {
    /// View region name.
    pub region: String,
    /// Frame date.
    pub date: NaiveDate,
    /// What went wrong.
    pub message: String,
}

/// Outcome of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Paths of the frames written.
    pub rendered: Vec<PathBuf>,
    /// Frames that failed.
    pub failed: Vec<FrameFailure>,
}

impl BatchReport {
    /// Returns `true` if no frame failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Command that assembles a region's rasterized frames into an animation.
#[must_use]
pub fn animation_hint(region: &str) -> String {
    let prefix = frame_prefix(region);
    format!("convert -geometry 2048x2048 -loop 0 -delay 100 {prefix}_*.png {prefix}.gif")
}

/// Renders every (region, date) frame.
///
/// Never aborts on a frame error: each failure is logged and recorded in
/// the returned [`BatchReport`].
#[allow(clippy::too_many_arguments)]
pub fn render_frames(
    boundaries: &BoundaryTable,
    cases: &CaseTable,
    regions: &[ViewRegion],
    dates: &[NaiveDate],
    projector: &dyn Projector,
    renderer: &dyn FrameRenderer,
    options: &BatchOptions,
    progress: &dyn ProgressCallback,
) -> BatchReport {
    let mut report = BatchReport::default();
    progress.set_total((regions.len() * dates.len()) as u64);

    for region in regions {
        progress.set_message(region.name.clone());

        let prepared = FrameContext::new(region, projector, options.attribution.as_deref())
            .map_err(RenderError::from)
            .and_then(|context| {
                let scale = region_scale(boundaries, cases, region, &context.window, dates, options)?;
                Ok((context, scale))
            });
        let (context, scale) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                for date in dates {
                    log::error!("Frame {} {date} failed: {e}", region.name);
                    report.failed.push(FrameFailure {
                        region: region.name.clone(),
                        date: *date,
                        message: e.to_string(),
                    });
                }
                progress.inc(dates.len() as u64);
                continue;
            }
        };

        log::info!(
            "{}: {} buckets, ticks {:?}",
            region.name,
            scale.buckets(),
            scale.ticks()
        );

        let before = report.rendered.len();
        for date in dates {
            let frame = JoinedFrame::build(boundaries, cases, *date);
            match renderer.render(&frame, &scale, &context) {
                Ok(path) => report.rendered.push(path),
                Err(e) => {
                    log::error!("Frame {} {date} failed: {e}", region.name);
                    report.failed.push(FrameFailure {
                        region: region.name.clone(),
                        date: *date,
                        message: e.to_string(),
                    });
                }
            }
            progress.inc(1);
        }

        if report.rendered.len() > before {
            log::info!(
                "{}: after rasterizing, assemble with: {}",
                region.name,
                animation_hint(&region.name)
            );
        }
    }

    progress.finish(format!(
        "{} frames written, {} failed",
        report.rendered.len(),
        report.failed.len()
    ));
    report
}

fn region_scale(
    boundaries: &BoundaryTable,
    cases: &CaseTable,
    region: &ViewRegion,
    rect: &Rect<f64>,
    dates: &[NaiveDate],
    options: &BatchOptions,
) -> Result<ClassificationScale, RenderError> {
    let max = window::find_max_in_region(boundaries, cases, rect, dates).ok_or_else(|| {
        RenderError::NoData {
            region: region.name.clone(),
        }
    })?;
    Ok(options.scale_for(max))
}
