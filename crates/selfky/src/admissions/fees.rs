//! The single fee schedule.
//!
//! Every call site that needs a fee (intake, order creation, reconciliation
//! audits) goes through [`fee`]. The function is total over both enums, so an
//! unrecognized category is unrepresentable rather than silently defaulted.

use super::domain::{Category, CourseType};

/// Application fee in INR for a (course, category) pair.
pub const fn fee(course: CourseType, category: Category) -> u32 {
    match (course, category) {
        (CourseType::Bpharm, Category::General | Category::Obc | Category::Ews) => 1200,
        (CourseType::Bpharm, Category::Sc | Category::St | Category::Pwd) => 800,
        (CourseType::Mpharm, Category::General | Category::Obc | Category::Ews) => 1500,
        (CourseType::Mpharm, Category::Sc | Category::St | Category::Pwd) => 1000,
    }
}

pub const CURRENCY: &str = "INR";
