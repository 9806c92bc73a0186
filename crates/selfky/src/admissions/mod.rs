//! Application intake, lifecycle, admit-card issuance, and the HTTP surface
//! for applicants and operators.

pub mod admin;
pub mod domain;
pub mod fees;
pub(crate) mod intake;
pub mod release;
pub mod render;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use admin::{admin_router, AdminState};
pub use domain::{
    AdmitCard, Application, ApplicationId, ApplicationStatus, ApplicationSubmission, Category,
    CourseType, DocumentRefs, PaymentProgress, PaymentSummary, PersonalDetails, TransitionError,
    UserId,
};
pub use intake::IntakeError;
pub use release::{ReleaseGate, ReleaseGateError, ReleaseState};
pub use render::{AdmitCardRenderer, RenderError, RenderedDocument};
pub use repository::{
    ApplicationFilter, ApplicationRepository, ApplicationStatusView, RepositoryError,
};
pub use router::{applicant_router, ApplicantState};
pub use service::{AdmissionsService, AdmissionsServiceError, PaymentOrderView};
