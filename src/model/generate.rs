//! Synthetic road networks.
//!
//! Jittered street grids normalized to the unit square, with some blocks
//! missing and some streets downgraded to footways. Same seed, same network.
use rand::Rng;

use crate::model::Coordinate;
use crate::model::NodeId;
use crate::model::RoadType;
use crate::model::RouteModel;
use crate::model::RouteModelError;

const STREET_TYPES: [RoadType; 6] = [
    RoadType::Primary,
    RoadType::Secondary,
    RoadType::Tertiary,
    RoadType::Residential,
    RoadType::Service,
    RoadType::Unclassified,
];

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridNetworkConfig {
    /// Intersections per row.
    pub width: usize,
    /// Intersections per column.
    pub height: usize,
    /// Fraction of a block an intersection may drift, in `[0, 0.5)`.
    pub jitter: f32,
    /// Probability of a block segment not existing.
    pub missing_segment_probability: f64,
    /// Probability of a street being a footway.
    pub footway_probability: f64,
    /// Metres spanned by the whole grid.
    pub metric_scale: f32,
}

impl Default for GridNetworkConfig {
    fn default() -> Self {
        Self {
            width: 32,
            height: 32,
            jitter: 0.3,
            missing_segment_probability: 0.15,
            footway_probability: 0.05,
            metric_scale: 1_000.0,
        }
    }
}

/// Builds a street grid.
///
/// Every row and column is cut into streets wherever a segment is missing, and
/// each street gets a single road type.
pub fn grid<R: Rng>(r: &mut R, config: &GridNetworkConfig) -> Result<RouteModel, RouteModelError> {
    let mut builder = RouteModel::builder();
    builder.metric_scale(config.metric_scale);

    let (w, h) = (config.width, config.height);
    let span_x = w.saturating_sub(1).max(1) as f32;
    let span_y = h.saturating_sub(1).max(1) as f32;

    let mut ids = Vec::<NodeId>::with_capacity(w * h);
    for y in 0..h {
        for x in 0..w {
            let dx = r.random_range(-config.jitter..=config.jitter);
            let dy = r.random_range(-config.jitter..=config.jitter);
            let c = Coordinate::new((x as f32 + dx) / span_x, (y as f32 + dy) / span_y);
            ids.push(builder.add_node(c)?);
        }
    }

    let rows = (0..h).map(|y| (0..w).map(|x| ids[y * w + x]).collect::<Vec<_>>());
    let columns = (0..w).map(|x| (0..h).map(|y| ids[y * w + x]).collect::<Vec<_>>());
    for line in rows.chain(columns) {
        let Some((first, rest)) = line.split_first() else {
            continue;
        };
        let mut street: Vec<NodeId> = vec![*first];
        for next in rest {
            if r.random_bool(config.missing_segment_probability) {
                add_street(r, config, &mut builder, &street)?;
                street.clear();
            }
            street.push(*next);
        }
        add_street(r, config, &mut builder, &street)?;
    }

    builder.build()
}

fn add_street<R: Rng>(
    r: &mut R,
    config: &GridNetworkConfig,
    builder: &mut crate::model::RouteModelBuilder,
    street: &[NodeId],
) -> Result<(), RouteModelError> {
    if street.len() < 2 {
        return Ok(());
    }
    let kind = if r.random_bool(config.footway_probability) {
        RoadType::Footway
    } else {
        STREET_TYPES[r.random_range(0..STREET_TYPES.len())]
    };
    builder.add_road(kind, street)
}
