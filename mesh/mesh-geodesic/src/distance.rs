//! Distance field representation.
//!
//! Stores per-vertex distance values computed by the geodesic engines,
//! together with the order in which vertices were settled and, optionally,
//! the source each vertex was reached from.

/// Per-vertex distance field.
///
/// `f64::INFINITY` marks a vertex that was never reached, either because it
/// lies in another connected component or because a budget stopped the
/// computation first.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceField {
    distances: Vec<f64>,
    /// Settled vertices in the order they were settled.
    order: Vec<usize>,
    /// Index into the caller's source slice, per vertex.
    clusters: Option<Vec<Option<usize>>>,
}

impl DistanceField {
    /// Create a distance field with all distances set to infinity.
    #[must_use]
    pub fn new(vertex_count: usize) -> Self {
        Self::from_distances(vec![f64::INFINITY; vertex_count])
    }

    /// Create a distance field from raw distances, with no sorted order and
    /// no cluster assignment.
    #[must_use]
    pub const fn from_distances(distances: Vec<f64>) -> Self {
        Self {
            distances,
            order: Vec::new(),
            clusters: None,
        }
    }

    /// Attach the order in which vertices were settled.
    #[must_use]
    pub fn with_order(mut self, order: Vec<usize>) -> Self {
        self.order = order;
        self
    }

    /// Attach a per-vertex cluster assignment.
    #[must_use]
    pub fn with_clusters(mut self, clusters: Vec<Option<usize>>) -> Self {
        self.clusters = Some(clusters);
        self
    }

    /// Distance to a vertex.
    ///
    /// Returns `f64::INFINITY` if the vertex is unreachable or the index is out of bounds.
    #[inline]
    #[must_use]
    pub fn distance(&self, vertex: usize) -> f64 {
        self.distances.get(vertex).copied().unwrap_or(f64::INFINITY)
    }

    /// Set the distance to a vertex.
    ///
    /// Returns `true` if successful, `false` if the index is out of bounds.
    #[inline]
    pub fn set_distance(&mut self, vertex: usize, distance: f64) -> bool {
        self.distances.get_mut(vertex).is_some_and(|d| {
            *d = distance;
            true
        })
    }

    /// Index of the source (into the slice passed to the solver) whose
    /// wavefront reached `vertex` first.
    ///
    /// `None` when clustering was not requested, the vertex was not reached,
    /// or the index is out of bounds.
    #[must_use]
    pub fn cluster(&self, vertex: usize) -> Option<usize> {
        self.clusters.as_ref()?.get(vertex).copied().flatten()
    }

    /// Whether a cluster assignment is attached.
    #[must_use]
    pub const fn has_clusters(&self) -> bool {
        self.clusters.is_some()
    }

    /// Vertices in the order they were settled.
    ///
    /// Fast marching reports vertices in non-decreasing distance. PTP reports
    /// its topological levels. The heat method has no causal order and
    /// leaves this empty.
    #[must_use]
    pub fn sorted_order(&self) -> &[usize] {
        &self.order
    }

    /// Number of settled vertices.
    #[must_use]
    pub fn count_finalized(&self) -> usize {
        self.order.len()
    }

    /// Number of vertices.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    /// Check if the distance field is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// All distances as a slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.distances
    }

    /// Consume and return the underlying vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<f64> {
        self.distances
    }

    /// Maximum finite distance, `None` if nothing is reachable.
    #[must_use]
    pub fn max_distance(&self) -> Option<f64> {
        self.distances
            .iter()
            .copied()
            .filter(|d| d.is_finite())
            .reduce(f64::max)
    }

    /// Count the number of reachable vertices (finite distance).
    #[must_use]
    pub fn reachable_count(&self) -> usize {
        self.distances.iter().filter(|d| d.is_finite()).count()
    }

    /// Count the number of unreachable vertices (infinite distance).
    #[must_use]
    pub fn unreachable_count(&self) -> usize {
        self.distances.iter().filter(|d| !d.is_finite()).count()
    }

    /// Iterate over (vertex index, distance) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.distances.iter().copied().enumerate()
    }

    /// Iterate over reachable vertices only.
    pub fn iter_reachable(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.iter().filter(|(_, d)| d.is_finite())
    }

    /// The settled vertex with the largest finite distance, or the largest
    /// finite vertex overall when there is no sorted order.
    ///
    /// Ties go to the vertex settled last. Fast marching settles in
    /// increasing distance, so there this is the last vertex of the order.
    #[must_use]
    pub fn farthest(&self) -> Option<usize> {
        if self.order.is_empty() {
            return self
                .iter_reachable()
                .max_by(|(_, a), (_, b)| a.total_cmp(b))
                .map(|(v, _)| v);
        }
        self.order
            .iter()
            .map(|&v| (v, self.distances[v]))
            .filter(|(_, d)| d.is_finite())
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(v, _)| v)
    }

    /// Distance of [`farthest`](Self::farthest).
    #[must_use]
    pub fn radius(&self) -> Option<f64> {
        self.farthest().map(|v| self.distances[v])
    }

    /// Rescale settled distances to `[0, 1]` in place.
    ///
    /// Settled means the vertices of [`sorted_order`](Self::sorted_order), or
    /// every finite distance when the order is empty. Nothing changes when
    /// the largest settled distance is zero. Calling this twice is the same
    /// as calling it once.
    pub fn normalize(&mut self) {
        if self.order.is_empty() {
            let Some(max) = self.max_distance().filter(|&m| m > 0.0) else {
                return;
            };
            for d in self.distances.iter_mut().filter(|d| d.is_finite()) {
                *d /= max;
            }
            return;
        }

        let max = self
            .order
            .iter()
            .map(|&v| self.distances[v])
            .filter(|d| d.is_finite())
            .fold(0.0, f64::max);
        if max <= 0.0 {
            return;
        }
        for &v in &self.order {
            self.distances[v] /= max;
        }
    }

    /// Normalized copy, see [`normalize`](Self::normalize).
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();
        out.normalize();
        out
    }
}

impl From<Vec<f64>> for DistanceField {
    fn from(distances: Vec<f64>) -> Self {
        Self::from_distances(distances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn new_distance_field() {
        let df = DistanceField::new(5);
        assert_eq!(df.len(), 5);
        assert!(df.distance(0).is_infinite());
        assert!(df.distance(4).is_infinite());
        assert_eq!(df.count_finalized(), 0);
        assert!(!df.has_clusters());
    }

    #[test]
    fn out_of_bounds() {
        let mut df = DistanceField::new(3);
        assert!(df.distance(10).is_infinite());
        assert!(!df.set_distance(10, 1.0));
        assert_eq!(df.cluster(10), None);
    }

    #[test]
    fn reachable_count() {
        let df = DistanceField::from_distances(vec![0.0, 1.0, f64::INFINITY, 2.0]);

        assert_eq!(df.reachable_count(), 3);
        assert_eq!(df.unreachable_count(), 1);
        assert_eq!(df.max_distance(), Some(2.0));
        assert_eq!(df.iter_reachable().count(), 3);
    }

    #[test]
    fn farthest_only_considers_settled_vertices() {
        // Vertex 1 is tentative.
        let df = DistanceField::from_distances(vec![0.0, 5.0, 3.0]).with_order(vec![0, 2]);
        assert_eq!(df.farthest(), Some(2));
        assert_eq!(df.radius(), Some(3.0));
    }

    #[test]
    fn farthest_is_largest_not_last_settled() {
        // Level order: the last entry is closer than the one before it.
        let df = DistanceField::from_distances(vec![0.0, 2.0, 8.5, 6.0])
            .with_order(vec![0, 1, 2, 3]);
        assert_eq!(df.farthest(), Some(2));
        assert_eq!(df.radius(), Some(8.5));
        assert_eq!(df.radius(), df.max_distance());
    }

    #[test]
    fn farthest_tie_goes_to_last_settled() {
        let df = DistanceField::from_distances(vec![0.0, 1.0, 1.0, f64::INFINITY])
            .with_order(vec![0, 2, 1, 3]);
        assert_eq!(df.farthest(), Some(1));
    }

    #[test]
    fn farthest_without_order() {
        let df = DistanceField::from_distances(vec![0.0, 1.0, 5.0, f64::INFINITY]);
        assert_eq!(df.farthest(), Some(2));
        assert_eq!(df.radius(), Some(5.0));

        let empty = DistanceField::new(2);
        assert_eq!(empty.farthest(), None);
        assert_eq!(empty.max_distance(), None);
    }

    #[test]
    fn clusters_are_optional() {
        let df = DistanceField::from_distances(vec![0.0, 1.0, f64::INFINITY])
            .with_clusters(vec![Some(0), Some(0), None]);
        assert!(df.has_clusters());
        assert_eq!(df.cluster(1), Some(0));
        assert_eq!(df.cluster(2), None);
    }

    #[test]
    fn normalize_settled_only() {
        // Vertex 2 holds a tentative value outside the settled set.
        let mut df = DistanceField::from_distances(vec![0.0, 4.0, 6.0, f64::INFINITY])
            .with_order(vec![0, 1]);
        df.normalize();

        assert_relative_eq!(df.distance(0), 0.0);
        assert_relative_eq!(df.distance(1), 1.0);
        assert_relative_eq!(df.distance(2), 6.0);
        assert!(df.distance(3).is_infinite());
    }

    #[test]
    fn normalize_without_order() {
        let df = DistanceField::from_distances(vec![0.0, 5.0, 10.0, f64::INFINITY]);
        let norm = df.normalized();

        assert_relative_eq!(norm.distance(1), 0.5);
        assert_relative_eq!(norm.distance(2), 1.0);
        assert!(norm.distance(3).is_infinite());
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = DistanceField::from_distances(vec![0.0, 0.3, 1.7, 2.9]).with_order(vec![0, 1, 2, 3]);
        let once = once.normalized();
        let twice = once.normalized();
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_zero_max_is_noop() {
        let mut df = DistanceField::from_distances(vec![0.0, f64::INFINITY]).with_order(vec![0]);
        let before = df.clone();
        df.normalize();
        assert_eq!(df, before);
    }
}
