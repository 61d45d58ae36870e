pub mod portal;
pub mod transcript;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{ClassSchedule, PassedCourses, RecordSet, SurveyMetadata, TakenSurvey};
use crate::report::{self, ErrorSink};

pub use portal::PortalSource;
pub use transcript::TranscriptSource;

/// The operations every student-data back-end answers.
#[async_trait]
pub trait AcademicSource: Send + Sync {
    async fn start_year(&self) -> Result<i32>;
    async fn student_id(&self) -> Result<String>;
    async fn class_schedules(&self) -> Result<Vec<ClassSchedule>>;
    async fn passed_courses(&self) -> Result<PassedCourses>;
    /// Every professor/class pairing listed on the survey page.
    async fn professor_classes_from_surveys(&self) -> Result<Vec<SurveyMetadata>>;
    /// Completed surveys with their answers, in page order.
    async fn taken_surveys(&self) -> Result<Vec<TakenSurvey>>;
}

/// Wraps a source so that every failure is sent to an [`ErrorSink`] under
/// the operation's name before being returned.
pub struct Reported<S> {
    inner: S,
    sink: Arc<dyn ErrorSink>,
}

impl<S: AcademicSource> Reported<S> {
    pub fn new(inner: S, sink: Arc<dyn ErrorSink>) -> Self {
        Self { inner, sink }
    }

    fn check<T>(&self, operation: &str, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            report::report(self.sink.as_ref(), operation, err);
        }
        result
    }
}

#[async_trait]
impl<S: AcademicSource> AcademicSource for Reported<S> {
    async fn start_year(&self) -> Result<i32> {
        self.check("getStartYear", self.inner.start_year().await)
    }

    async fn student_id(&self) -> Result<String> {
        self.check("getStudentId", self.inner.student_id().await)
    }

    async fn class_schedules(&self) -> Result<Vec<ClassSchedule>> {
        self.check("getClassSchedules", self.inner.class_schedules().await)
    }

    async fn passed_courses(&self) -> Result<PassedCourses> {
        self.check("getPassedCourses", self.inner.passed_courses().await)
    }

    async fn professor_classes_from_surveys(&self) -> Result<Vec<SurveyMetadata>> {
        self.check(
            "getProfessorClassesFromSurveys",
            self.inner.professor_classes_from_surveys().await,
        )
    }

    async fn taken_surveys(&self) -> Result<Vec<TakenSurvey>> {
        self.check("getTakenSurveys", self.inner.taken_surveys().await)
    }
}

/// Run every operation in turn. The first failure ends the run.
pub async fn collect_all(source: &dyn AcademicSource) -> Result<RecordSet> {
    Ok(RecordSet {
        student_id: source.student_id().await?,
        start_year: source.start_year().await?,
        class_schedules: source.class_schedules().await?,
        passed_courses: source.passed_courses().await?,
        professor_classes: source.professor_classes_from_surveys().await?,
        taken_surveys: source.taken_surveys().await?,
    })
}
