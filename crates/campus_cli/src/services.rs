//! Mock remote services with artificial latency
//!
//! Stand-ins for the student directory, the grading service and the booking
//! system. Each answers from the catalog after a configurable delay.

use std::sync::Arc;
use std::time::Duration;

use campus_select::{matches, CandidateSource, FetchError, RemoteSource, ResultSet};
use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;
use tokio::time::sleep;

use crate::catalog::{Booking, Course, Student, TimeSlot};

/// Extra latency per missing character below this query length
const BROAD_QUERY_LEN: u64 = 4;
const BROAD_QUERY_PENALTY_MS: u64 = 60;

/// Student lookup by name
///
/// Short queries scan more records and answer more slowly, so an early broad
/// query can land after a later narrow one.
pub struct StudentDirectory {
    students: Arc<[Student]>,
    latency_ms: u64,
}

impl StudentDirectory {
    pub fn new(students: Vec<Student>, latency_ms: u64) -> Self {
        Self {
            students: students.into(),
            latency_ms,
        }
    }

    /// How long a query takes to answer
    pub fn latency_for(&self, query: &str) -> u64 {
        let len = query.trim().chars().count() as u64;
        self.latency_ms + BROAD_QUERY_PENALTY_MS * BROAD_QUERY_LEN.saturating_sub(len)
    }
}

impl RemoteSource<String, Vec<Student>> for StudentDirectory {
    fn fetch(&self, query: String) -> BoxFuture<'static, Result<Vec<Student>, FetchError>> {
        let students = Arc::clone(&self.students);
        let delay = self.latency_for(&query);
        async move {
            sleep(Duration::from_millis(delay)).await;
            let query = query.trim();
            Ok(students
                .iter()
                .filter(|s| matches(&s.name, query))
                .cloned()
                .collect())
        }
        .boxed()
    }
}

/// Hypothetical grades keyed by course code, in the order they were entered
pub type WhatIf = IndexMap<String, String>;

/// Result of a GPA what-if simulation
#[derive(Debug, Clone, PartialEq)]
pub struct GpaSimulation {
    pub gpa: f64,
    pub credits: u32,
    pub graded: usize,
}

impl ResultSet for GpaSimulation {
    fn result_count(&self) -> usize {
        self.graded
    }
}

/// Grade points on the 4.0 scale
pub fn grade_points(grade: &str) -> Option<f64> {
    let points = match grade.trim().to_ascii_uppercase().as_str() {
        "A" | "A+" => 4.0,
        "A-" => 3.7,
        "B+" => 3.3,
        "B" => 3.0,
        "B-" => 2.7,
        "C+" => 2.3,
        "C" => 2.0,
        "C-" => 1.7,
        "D" => 1.0,
        "F" => 0.0,
        _ => return None,
    };
    Some(points)
}

/// Credit-weighted GPA over the what-if grades
pub fn simulate(courses: &[Course], what_if: &WhatIf) -> Result<GpaSimulation, FetchError> {
    let mut weighted = 0.0;
    let mut credits = 0u32;

    for (code, grade) in what_if {
        let course = courses
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code))
            .ok_or_else(|| FetchError::Remote {
                status: 422,
                message: format!("unknown course {code}"),
            })?;
        let points = grade_points(grade).ok_or_else(|| FetchError::Remote {
            status: 422,
            message: format!("invalid grade {grade:?} for {code}"),
        })?;
        weighted += points * f64::from(course.credits);
        credits += u32::from(course.credits);
    }

    let gpa = if credits == 0 {
        0.0
    } else {
        weighted / f64::from(credits)
    };
    Ok(GpaSimulation {
        gpa,
        credits,
        graded: what_if.len(),
    })
}

/// Remote GPA simulation
pub struct GradingService {
    courses: Arc<[Course]>,
    latency_ms: u64,
}

impl GradingService {
    pub fn new(courses: Vec<Course>, latency_ms: u64) -> Self {
        Self {
            courses: courses.into(),
            latency_ms,
        }
    }
}

impl RemoteSource<WhatIf, GpaSimulation> for GradingService {
    fn fetch(&self, what_if: WhatIf) -> BoxFuture<'static, Result<GpaSimulation, FetchError>> {
        let courses = Arc::clone(&self.courses);
        let delay = self.latency_ms;
        async move {
            sleep(Duration::from_millis(delay)).await;
            simulate(&courses, &what_if)
        }
        .boxed()
    }
}

/// Slots offered per room, and the bookings that consume them
///
/// The two halves answer with different latencies, the way the room
/// inventory and the booking system do.
pub struct BookingService {
    slots: Arc<[TimeSlot]>,
    bookings: Arc<[Booking]>,
    slots_latency_ms: u64,
    bookings_latency_ms: u64,
}

impl BookingService {
    pub fn new(
        slots: Vec<TimeSlot>,
        bookings: Vec<Booking>,
        slots_latency_ms: u64,
        bookings_latency_ms: u64,
    ) -> Self {
        Self {
            slots: slots.into(),
            bookings: bookings.into(),
            slots_latency_ms,
            bookings_latency_ms,
        }
    }
}

impl CandidateSource<u32, TimeSlot> for BookingService {
    fn candidates(&self, room: &u32) -> BoxFuture<'static, Result<Vec<TimeSlot>, FetchError>> {
        let room = *room;
        let slots = Arc::clone(&self.slots);
        let delay = self.slots_latency_ms;
        async move {
            sleep(Duration::from_millis(delay)).await;
            Ok(slots.iter().filter(|s| s.room == room).cloned().collect())
        }
        .boxed()
    }

    fn exclusions(&self, room: &u32) -> BoxFuture<'static, Result<Vec<String>, FetchError>> {
        let room = *room;
        let bookings = Arc::clone(&self.bookings);
        let delay = self.bookings_latency_ms;
        async move {
            sleep(Duration::from_millis(delay)).await;
            Ok(bookings
                .iter()
                .filter(|b| b.room == room)
                .map(|b| b.slot.clone())
                .collect())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use campus_select::compute_candidates;

    fn what_if(pairs: &[(&str, &str)]) -> WhatIf {
        pairs
            .iter()
            .map(|(c, g)| (c.to_string(), g.to_string()))
            .collect()
    }

    #[test]
    fn test_broad_queries_are_slower() {
        let directory = StudentDirectory::new(Vec::new(), 100);
        assert_eq!(directory.latency_for("a"), 280);
        assert_eq!(directory.latency_for("alic"), 100);
        assert_eq!(directory.latency_for("alice"), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_directory_filters_by_name() {
        let directory = StudentDirectory::new(Catalog::sample().students, 50);
        let found = directory.fetch("bo".to_string()).await.unwrap();
        let names: Vec<_> = found.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Bo Chen", "Bobby Tables"]);
    }

    #[test]
    fn test_simulate_weights_by_credits() {
        let courses = Catalog::sample().courses;
        // 4.0 * 4 + 2.0 * 2 = 20 over 6 credits
        let result = simulate(&courses, &what_if(&[("CS101", "A"), ("EN150", "C")])).unwrap();
        assert_eq!(result.credits, 6);
        assert!((result.gpa - 20.0 / 6.0).abs() < 1e-9);
        assert_eq!(result.result_count(), 2);
    }

    #[test]
    fn test_simulate_rejects_unknown_course_and_grade() {
        let courses = Catalog::sample().courses;
        assert!(matches!(
            simulate(&courses, &what_if(&[("ZZ999", "A")])),
            Err(FetchError::Remote { status: 422, .. })
        ));
        assert!(simulate(&courses, &what_if(&[("CS101", "E")])).is_err());
    }

    #[test]
    fn test_empty_what_if() {
        let result = simulate(&[], &WhatIf::new()).unwrap();
        assert_eq!(result.gpa, 0.0);
        assert_eq!(result.graded, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_booked_slots_excluded() {
        let catalog = Catalog::sample();
        let service = BookingService::new(catalog.slots, catalog.bookings, 10, 30);
        let slots = compute_candidates(&service, &3u32).await.unwrap();
        let ids: Vec<_> = slots.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["R3-T3", "R3-T4"]);
    }
}
