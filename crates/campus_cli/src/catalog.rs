//! Sample campus catalog
//!
//! The records the demo forms pick from. A catalog can be loaded from JSON with
//! `--catalog`; otherwise [`Catalog::sample`] is used.

use anyhow::{Context, Result};
use campus_select::Choice;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Room {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub building: String,
    #[serde(default)]
    pub capacity: u32,
}

impl Choice for Room {
    type Key = u32;

    fn label(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn key(&self) -> u32 {
        self.id
    }
}

/// A bookable slot offered in one room
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TimeSlot {
    pub id: String,
    pub room: u32,
    pub label: String,
}

impl Choice for TimeSlot {
    type Key = String;

    fn label(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.label)
    }

    fn key(&self) -> String {
        self.id.clone()
    }
}

/// A slot already taken in a room
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Booking {
    pub room: u32,
    pub slot: String,
    pub course: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Instructor {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub department: String,
    /// On leave; listed but not assignable
    #[serde(default)]
    pub on_leave: bool,
}

impl Choice for Instructor {
    type Key = u32;

    fn label(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn key(&self) -> u32 {
        self.id
    }

    fn is_disabled(&self) -> bool {
        self.on_leave
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Course {
    pub code: String,
    pub title: String,
    pub credits: u8,
}

impl Choice for Course {
    type Key = String;

    fn label(&self) -> Cow<'_, str> {
        Cow::Owned(format!("{} {}", self.code, self.title))
    }

    fn key(&self) -> String {
        self.code.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Student {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub program: String,
}

impl Choice for Student {
    type Key = u32;

    fn label(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn key(&self) -> u32 {
        self.id
    }
}

/// Everything the demo forms can pick from
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Catalog {
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub slots: Vec<TimeSlot>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
    #[serde(default)]
    pub instructors: Vec<Instructor>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub students: Vec<Student>,
}

impl Catalog {
    /// Load from a JSON file, or fall back to the built-in sample
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::sample());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn room(&self, id: u32) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == id)
    }

    pub fn course(&self, code: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.code.eq_ignore_ascii_case(code))
    }

    /// Built-in sample data
    pub fn sample() -> Self {
        let rooms = vec![
            room(1, "Room A", "Hartley Hall", 40),
            room(2, "Room B", "Hartley Hall", 24),
            room(3, "Lecture Theatre 1", "Science Block", 180),
            room(4, "Seminar Room 4", "Library", 16),
        ];

        let times = ["Mon 09:00", "Mon 11:00", "Tue 09:00", "Wed 14:00"];
        let slots = rooms
            .iter()
            .flat_map(|r| {
                times.iter().enumerate().map(move |(i, label)| TimeSlot {
                    id: format!("R{}-T{}", r.id, i + 1),
                    room: r.id,
                    label: label.to_string(),
                })
            })
            .collect();

        let bookings = vec![
            booking(2, "R2-T3", "CS240"),
            booking(3, "R3-T1", "MA101"),
            booking(3, "R3-T2", "PH110"),
        ];

        let instructors = vec![
            instructor(10, "Dr. Amara Okafor", "Computer Science", false),
            instructor(11, "Prof. Lars Lindqvist", "Mathematics", false),
            instructor(12, "Dr. Mei Tanaka", "Physics", true),
            instructor(13, "Dr. Sam Rivera", "Computer Science", false),
        ];

        let courses = vec![
            course("CS101", "Intro to Programming", 4),
            course("CS240", "Data Structures", 4),
            course("MA101", "Calculus I", 3),
            course("PH110", "Mechanics", 3),
            course("EN150", "Academic Writing", 2),
        ];

        let students = [
            (1001, "Alice Li", "BSc Computer Science"),
            (1002, "Alina Cruz", "BSc Mathematics"),
            (1003, "Bo Chen", "BSc Physics"),
            (1004, "Bobby Tables", "BSc Computer Science"),
            (1005, "Carla Diaz", "BA English"),
            (1006, "Dmitri Volkov", "BSc Mathematics"),
            (1007, "Xavier Yates", "BSc Physics"),
            (1008, "Xyla Brooks", "BA English"),
        ]
        .into_iter()
        .map(|(id, name, program)| Student {
            id,
            name: name.to_string(),
            program: program.to_string(),
        })
        .collect();

        Self {
            rooms,
            slots,
            bookings,
            instructors,
            courses,
            students,
        }
    }
}

fn room(id: u32, name: &str, building: &str, capacity: u32) -> Room {
    Room {
        id,
        name: name.to_string(),
        building: building.to_string(),
        capacity,
    }
}

fn booking(room: u32, slot: &str, course: &str) -> Booking {
    Booking {
        room,
        slot: slot.to_string(),
        course: course.to_string(),
    }
}

fn instructor(id: u32, name: &str, department: &str, on_leave: bool) -> Instructor {
    Instructor {
        id,
        name: name.to_string(),
        department: department.to_string(),
        on_leave,
    }
}

fn course(code: &str, title: &str, credits: u8) -> Course {
    Course {
        code: code.to_string(),
        title: title.to_string(),
        credits,
    }
}
