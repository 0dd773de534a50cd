/// Errors produced by the geometric solvers.
///
/// Every variant is an anticipated outcome of working with measured points;
/// callers are expected to recover (re-pick points, re-run detection).
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometryError {
    /// The three surface points are collinear or coincident.
    #[error("surface points are collinear or coincident")]
    DegeneratePlane,
    /// The correspondence set is degenerate or the solved matrix is not
    /// invertible.
    #[error("perspective transform is singular")]
    SingularHomography,
}
