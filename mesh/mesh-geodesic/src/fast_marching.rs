//! Fast marching on triangle meshes.
//!
//! Vertices are finalized in order of increasing distance. Each time a
//! vertex is finalized, its active neighbors are re-estimated with the
//! triangle update rule over their whole star. The priority queue never
//! decreases keys: improved vertices are pushed again and outdated entries
//! are skipped when popped.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::debug;

use crate::adapter::MeshAdapter;
use crate::distance::DistanceField;
use crate::params::GeodesicParams;
use crate::update::{VertexUpdate, update_step};

/// Per-vertex propagation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Unvisited,
    Active,
    Finalized,
}

/// Priority queue entry.
#[derive(Debug, Clone, Copy)]
struct State {
    vertex: usize,
    distance: f64,
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap; vertex id keeps pops deterministic.
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

/// Run fast marching from `sources`.
///
/// Sources must be valid vertex indices. The iteration and radius budgets of
/// `params` truncate the sorted order; vertices left behind keep their
/// tentative or infinite distance.
pub(crate) fn fast_marching<M: MeshAdapter + ?Sized>(
    mesh: &M,
    sources: &[usize],
    params: &GeodesicParams,
) -> DistanceField {
    let vertex_count = mesh.vertex_count();
    let mut distances = vec![f64::INFINITY; vertex_count];
    let mut color = vec![Color::Unvisited; vertex_count];
    let mut clusters = params.clusters.then(|| vec![None; vertex_count]);

    let mut heap = BinaryHeap::with_capacity(vertex_count);
    for (i, &source) in sources.iter().enumerate() {
        if color[source] != Color::Unvisited {
            continue;
        }
        distances[source] = 0.0;
        color[source] = Color::Active;
        if let Some(clusters) = clusters.as_mut() {
            clusters[source] = Some(i);
        }
        heap.push(State {
            vertex: source,
            distance: 0.0,
        });
    }

    let budget = params.max_iterations.unwrap_or(vertex_count);
    let mut order = Vec::with_capacity(budget.min(vertex_count));

    while order.len() < budget {
        let Some(State { vertex, distance }) = heap.pop() else {
            break;
        };

        if color[vertex] == Color::Finalized || distance > distances[vertex] {
            continue;
        }
        if distance > params.radius {
            debug!(vertex, distance, radius = params.radius, "Radius budget reached");
            break;
        }

        color[vertex] = Color::Finalized;
        order.push(vertex);

        for u in mesh.neighbors(vertex) {
            if color[u] == Color::Unvisited {
                color[u] = Color::Active;
            }
            if color[u] != Color::Active {
                continue;
            }

            let Some(best) = best_update(mesh, &distances, u) else {
                continue;
            };
            distances[u] = best.distance;
            if let Some(clusters) = clusters.as_mut() {
                clusters[u] = clusters[best.contributor];
            }
            heap.push(State {
                vertex: u,
                distance: best.distance,
            });
        }
    }

    if order.len() == budget && budget < vertex_count {
        debug!(budget, "Iteration budget reached");
    }

    let field = DistanceField::from_distances(distances).with_order(order);
    match clusters {
        Some(clusters) => field.with_clusters(clusters),
        None => field,
    }
}

/// Smallest estimate for `vertex` over its star, if it improves on the
/// current value.
pub(crate) fn best_update<M: MeshAdapter + ?Sized>(
    mesh: &M,
    distances: &[f64],
    vertex: usize,
) -> Option<VertexUpdate> {
    let mut best: Option<VertexUpdate> = None;
    for he in mesh.incident_half_edges(vertex) {
        let up = update_step(mesh, distances, he);
        let current = best.map_or(distances[vertex], |b| b.distance);
        if up.distance < current {
            best = Some(up);
        }
    }
    best
}
