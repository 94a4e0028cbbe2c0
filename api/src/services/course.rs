//! Race course document parser.
//!
//! Reads the race XML published alongside the boat logs to extract:
//! - Compound marks: `<CompoundMark CompoundMarkID=.. Name=..>` with one or
//!   more `<Mark TargetLat=.. TargetLng=..>` children, reduced to a centroid
//! - The course boundary: `<CourseLimit name="Boundary">` with ordered
//!   `<Limit Lat=.. Lon=..>` vertices, returned unclosed

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;
use thiserror::Error;

use crate::models::{CourseBoundary, CourseMark, Position, RaceCourse};

/// Name attribute of the `CourseLimit` that holds the racing area.
const BOUNDARY_LIMIT_NAME: &str = "Boundary";

/// Errors that can occur while loading a race course.
#[derive(Debug, Error)]
pub enum CourseError {
    #[error("IO error reading course file: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Malformed course data: {0}")]
    MalformedCourseData(String),
    #[error("No CourseLimit named 'Boundary' found")]
    BoundaryNotFound,
}

/// Parse a course document from disk.
pub fn load_course_file(path: &Path) -> Result<RaceCourse, CourseError> {
    let xml = std::fs::read_to_string(path)?;
    let course = parse_course(&xml)?;
    tracing::info!(
        "Loaded course from {}: {} marks, {} boundary vertices",
        path.display(),
        course.marks.len(),
        course.boundary.vertices.len()
    );
    Ok(course)
}

/// Compound mark being collected while inside a `<CompoundMark>` element.
struct PendingMark {
    id: String,
    name: String,
    points: Vec<Position>,
}

impl PendingMark {
    fn finish(self) -> Result<CourseMark, CourseError> {
        if self.points.is_empty() {
            return Err(CourseError::MalformedCourseData(format!(
                "compound mark '{}' has no Mark points",
                self.id
            )));
        }
        let n = self.points.len() as f64;
        let lat = self.points.iter().map(|p| p.lat).sum::<f64>() / n;
        let lon = self.points.iter().map(|p| p.lon).sum::<f64>() / n;
        Ok(CourseMark {
            id: self.id,
            name: self.name,
            position: Position { lat, lon },
        })
    }
}

/// Parse course XML into marks and the (unclosed) boundary.
pub fn parse_course(xml: &str) -> Result<RaceCourse, CourseError> {
    let mut reader = Reader::from_str(xml);

    let mut course = RaceCourse::default();
    let mut pending: Option<PendingMark> = None;

    let mut boundary: Option<CourseBoundary> = None;
    let mut in_boundary = false;

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match local_name_str(e.name().as_ref()).as_str() {
                "CompoundMark" => pending = Some(start_compound_mark(e)?),
                "Mark" => {
                    // Mark elements normally self-close; an open one still carries its attributes
                    if let Some(ref mut mark) = pending {
                        mark.points.push(mark_point(e, &mark.id)?);
                    }
                }
                "CourseLimit" => {
                    in_boundary = open_boundary(e, &mut boundary)?;
                }
                "Limit" if in_boundary => push_limit(e, &mut boundary)?,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name_str(e.name().as_ref()).as_str() {
                "CompoundMark" => {
                    // <CompoundMark/> has no points
                    push_mark(&mut course, start_compound_mark(e)?.finish()?)?;
                }
                "Mark" => {
                    if let Some(ref mut mark) = pending {
                        mark.points.push(mark_point(e, &mark.id)?);
                    }
                }
                "CourseLimit" => {
                    open_boundary(e, &mut boundary)?;
                }
                "Limit" if in_boundary => push_limit(e, &mut boundary)?,
                _ => {}
            },
            Ok(Event::End(ref e)) => match local_name_str(e.name().as_ref()).as_str() {
                "CompoundMark" => {
                    if let Some(mark) = pending.take() {
                        push_mark(&mut course, mark.finish()?)?;
                    }
                }
                "CourseLimit" => in_boundary = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(CourseError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    course.boundary = boundary.ok_or(CourseError::BoundaryNotFound)?;
    tracing::debug!(
        "Parsed {} compound marks and a {}-vertex boundary",
        course.marks.len(),
        course.boundary.vertices.len()
    );

    Ok(course)
}

fn start_compound_mark(e: &BytesStart) -> Result<PendingMark, CourseError> {
    let id = attr_value(e, "CompoundMarkID").ok_or_else(|| {
        CourseError::MalformedCourseData("CompoundMark without CompoundMarkID".to_string())
    })?;
    let name = attr_value(e, "Name").unwrap_or_else(|| id.clone());
    Ok(PendingMark {
        id,
        name,
        points: Vec::new(),
    })
}

fn push_mark(course: &mut RaceCourse, mark: CourseMark) -> Result<(), CourseError> {
    if course.mark(&mark.id).is_some() {
        return Err(CourseError::MalformedCourseData(format!(
            "duplicate CompoundMarkID '{}'",
            mark.id
        )));
    }
    course.marks.push(mark);
    Ok(())
}

fn mark_point(e: &BytesStart, compound_id: &str) -> Result<Position, CourseError> {
    let context = format!("Mark in compound mark '{}'", compound_id);
    Ok(Position {
        lat: coordinate_attr(e, "TargetLat", &context)?,
        lon: coordinate_attr(e, "TargetLng", &context)?,
    })
}

/// Returns whether this `CourseLimit` is the boundary (so its `Limit`s are collected).
fn open_boundary(
    e: &BytesStart,
    boundary: &mut Option<CourseBoundary>,
) -> Result<bool, CourseError> {
    if attr_value(e, "name").as_deref() != Some(BOUNDARY_LIMIT_NAME) {
        return Ok(false);
    }
    if boundary.is_some() {
        return Err(CourseError::MalformedCourseData(format!(
            "more than one CourseLimit named '{}'",
            BOUNDARY_LIMIT_NAME
        )));
    }
    *boundary = Some(CourseBoundary::default());
    Ok(true)
}

fn push_limit(e: &BytesStart, boundary: &mut Option<CourseBoundary>) -> Result<(), CourseError> {
    let vertex = Position {
        lat: coordinate_attr(e, "Lat", "boundary Limit")?,
        lon: coordinate_attr(e, "Lon", "boundary Limit")?,
    };
    if let Some(b) = boundary.as_mut() {
        b.vertices.push(vertex);
    }
    Ok(())
}

fn coordinate_attr(e: &BytesStart, key: &str, context: &str) -> Result<f64, CourseError> {
    let raw = attr_value(e, key).ok_or_else(|| {
        CourseError::MalformedCourseData(format!("{} is missing '{}'", context, key))
    })?;
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            CourseError::MalformedCourseData(format!(
                "{} has invalid '{}' value '{}'",
                context, key, raw
            ))
        })
}

fn attr_value(e: &BytesStart, key: &str) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        let k = std::str::from_utf8(attr.key.as_ref()).unwrap_or("");
        if k == key {
            std::str::from_utf8(&attr.value).ok().map(str::to_string)
        } else {
            None
        }
    })
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name_str(full: &[u8]) -> String {
    let s = std::str::from_utf8(full).unwrap_or("");
    match s.rfind(':') {
        Some(pos) => s[pos + 1..].to_string(),
        None => s.to_string(),
    }
}
