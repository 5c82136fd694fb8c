//! TimeSkill: the current date and time in the local timezone

use crate::function::{FunctionView, NativeFunction};
use crate::registry::SkillCollection;
use chrono::{DateTime, Local, TimeZone};

pub const COLLECTION: &str = "TimeSkill";

/// e.g. "Sunday, 12 January, 2031"
pub fn today<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%A, %d %B, %Y").to_string()
}

/// e.g. "Sunday, January 12, 2031 9:15 PM"
pub fn now<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%A, %B %d, %Y %-I:%M %p").to_string()
}

/// e.g. "09:15:43 PM"
pub fn time<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%I:%M:%S %p").to_string()
}

fn view(name: &str, description: &str) -> FunctionView {
    FunctionView::new(COLLECTION, name).with_description(description)
}

pub fn register(collection: &mut SkillCollection) {
    collection
        .register(NativeFunction::new(view("Today", "Get the current date"), |_| {
            Ok(today(&Local::now()))
        }))
        .register(NativeFunction::new(
            view("Now", "Get the current date and time in the local time zone"),
            |_| Ok(now(&Local::now())),
        ))
        .register(NativeFunction::new(view("Time", "Get the current time"), |_| {
            Ok(time(&Local::now()))
        }))
        .register(NativeFunction::new(view("Year", "Get the current year"), |_| {
            Ok(Local::now().format("%Y").to_string())
        }));
}
