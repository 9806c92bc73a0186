use crate::infra::{
    InMemoryApplicationRepository, InMemoryPaymentLedger, InMemoryReleaseGate,
    InMemoryUserRepository, LoggingNotificationSender, PlainTextRenderer,
};
use chrono::{NaiveDate, Utc};
use clap::Args;
use selfky::accounts::{AccountsService, JwtAuth};
use selfky::admissions::{
    AdmissionsService, ApplicationSubmission, Category, CourseType, DocumentRefs, PersonalDetails,
};
use selfky::config::ExamDefaults;
use selfky::error::AppError;
use selfky::payments::{
    GatewayError, GatewayOrder, OrderRequest, PaymentGateway, PaymentId, PaymentLedger,
    PaymentRecord, PaymentState, SignedCallback,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Course to apply for in the demo scenario
    #[arg(long, default_value = "bpharm")]
    pub(crate) course: String,
    /// Skip the crash-recovery reconciliation portion of the demo
    #[arg(long)]
    pub(crate) skip_reconciliation: bool,
}

/// Offline stand-in gateway so the demo runs without credentials.
#[derive(Default)]
struct DemoGateway {
    counter: AtomicU64,
}

impl DemoGateway {
    fn signature_for(order_id: &str, payment_id: &str) -> String {
        format!("demo-sig({order_id}|{payment_id})")
    }
}

impl PaymentGateway for DemoGateway {
    async fn create_order(&self, request: OrderRequest) -> Result<GatewayOrder, GatewayError> {
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed);
        Ok(GatewayOrder {
            order_id: format!("order_demo_{sequence:04}"),
            amount: request.amount,
            currency: request.currency,
        })
    }

    fn verify_signature(&self, callback: &SignedCallback) -> Result<bool, GatewayError> {
        Ok(callback.signature == Self::signature_for(&callback.order_id, &callback.payment_id))
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let course = match args.course.trim().to_ascii_lowercase().as_str() {
        "mpharm" => CourseType::Mpharm,
        _ => CourseType::Bpharm,
    };

    println!("Selfky admissions demo");

    let repository = Arc::new(InMemoryApplicationRepository::default());
    let ledger = Arc::new(InMemoryPaymentLedger::default());
    let users = Arc::new(InMemoryUserRepository::default());
    let notifications = Arc::new(LoggingNotificationSender);
    let release = Arc::new(InMemoryReleaseGate::default());

    let accounts = AccountsService::new(
        users.clone(),
        notifications.clone(),
        JwtAuth::new("demo-secret"),
    );
    let service = AdmissionsService::new(
        repository,
        ledger.clone(),
        Arc::new(DemoGateway::default()),
        users,
        notifications,
        release,
        Arc::new(PlainTextRenderer),
        ExamDefaults {
            center: "Main Campus, Block A".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 6, 15).expect("valid date"),
            time: "10:00 AM".to_string(),
        },
    );

    let registered = match accounts.register("demo@selfky.example", "demo-password-1", None) {
        Ok(registered) => registered,
        Err(err) => {
            println!("  Registration rejected: {err}");
            return Ok(());
        }
    };
    println!("- Registered applicant {}", registered.user_id.0);

    let submission = ApplicationSubmission {
        course_type: course,
        personal_details: PersonalDetails {
            full_name: "Asha Verma".to_string(),
            fathers_name: "Ramesh Verma".to_string(),
            category: Category::General,
            date_of_birth: NaiveDate::from_ymd_opt(2003, 4, 18).expect("valid date"),
        },
        documents: DocumentRefs {
            photo_key: "uploads/demo/photo.jpg".to_string(),
            signature_key: "uploads/demo/signature.jpg".to_string(),
        },
    };

    let application = match service.submit(&registered.user_id, submission) {
        Ok(application) => application,
        Err(err) => {
            println!("  Submission rejected: {err}");
            return Ok(());
        }
    };
    println!(
        "- Application {} accepted -> status {} | fee INR {}",
        application.application_number,
        application.status.label(),
        application.payment.amount
    );

    let order = match service
        .create_payment_order(&registered.user_id, &application.id)
        .await
    {
        Ok(order) => order,
        Err(err) => {
            println!("  Order creation failed: {err}");
            return Ok(());
        }
    };
    println!(
        "- Gateway order {} opened for INR {}",
        order.gateway_order_id, order.amount
    );

    let callback = SignedCallback {
        order_id: order.gateway_order_id.clone(),
        payment_id: "pay_demo_0001".to_string(),
        signature: DemoGateway::signature_for(&order.gateway_order_id, "pay_demo_0001"),
    };
    match service.verify_payment(&callback) {
        Ok(settled) => println!(
            "- Payment verified -> status {} | transaction {}",
            settled.status.label(),
            settled
                .payment
                .transaction_id
                .as_deref()
                .unwrap_or("<none>")
        ),
        Err(err) => {
            println!("  Verification failed: {err}");
            return Ok(());
        }
    }

    if !args.skip_reconciliation {
        // Plant a completed ledger record whose application missed its
        // update, the classic crash-between-writes scenario.
        let now = Utc::now();
        let orphaned = PaymentRecord {
            id: PaymentId("demo-ledger-orphan".to_string()),
            application_id: selfky::admissions::ApplicationId("app-ghost".to_string()),
            user_id: registered.user_id.clone(),
            gateway_order_id: "order_demo_ghost".to_string(),
            gateway_payment_id: None,
            amount: application.payment.amount,
            currency: "INR".to_string(),
            status: PaymentState::Pending,
            receipt: "rcpt-demo-ghost".to_string(),
            note: None,
            error_message: None,
            created_at: now,
            paid_at: None,
        };
        let _ = ledger.record_order_created(orphaned);
        let _ = ledger.record_payment_verified("order_demo_ghost", "pay_demo_ghost", now);

        match service.reconcile() {
            Ok(report) => println!(
                "- Reconciliation: examined {} | repaired {} | orphaned {} | consistent {}",
                report.examined,
                report.repaired.len(),
                report.orphaned.len(),
                report.consistent
            ),
            Err(err) => println!("  Reconciliation failed: {err}"),
        }
    }

    if let Err(err) = service.set_release(true) {
        println!("  Release toggle failed: {err}");
        return Ok(());
    }
    match service.admit_card(&registered.user_id, &application.id) {
        Ok((issued, card)) => println!(
            "- Admit card issued -> status {} | roll number {} | exam {} {}",
            issued.status.label(),
            card.roll_number,
            card.exam_date,
            card.exam_time
        ),
        Err(err) => println!("  Admit card unavailable: {err}"),
    }

    Ok(())
}
