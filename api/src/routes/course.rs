use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{CourseMark, Position};
use crate::routes::AppState;

/// Response type for GET /api/v1/course.
#[derive(Debug, Serialize, ToSchema)]
pub struct CourseResponse {
    /// Compound marks at the centroid of their constituent marks
    pub marks: Vec<CourseMark>,
    /// Boundary polygon, closed (first vertex repeated last)
    pub boundary_polygon: Vec<Position>,
}

/// Get the race course overlay.
#[utoipa::path(
    get,
    path = "/api/v1/course",
    tag = "Course",
    responses(
        (status = 200, description = "Course marks and closed boundary", body = CourseResponse),
    )
)]
pub async fn get_course(State(state): State<AppState>) -> Json<CourseResponse> {
    Json(CourseResponse {
        marks: state.course.marks.clone(),
        boundary_polygon: state.course.boundary.closed(),
    })
}
