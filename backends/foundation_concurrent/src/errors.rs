use derive_more::From;

use std::{error, fmt, sync::Arc};

pub type BoxedError = Box<dyn error::Error + Send + Sync + 'static>;

pub type ConcurrentResult<T> = std::result::Result<T, ConcurrentError>;

/// `InvalidOperation` names the state violation behind a
/// [`ConcurrentError::InvalidOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidOperation {
    /// The collection was marked complete for adding.
    AddingCompleted,

    /// The collection is completed and empty, no more items will arrive.
    NoMoreItems,

    /// Every collection handed to a take-from-any call is completed and empty.
    AllCollectionsCompleted,

    /// The backing container refused the item.
    ContainerRefused,

    /// A barrier with no participants cannot rendezvous.
    ZeroParticipants,

    /// The thread running a post-phase action called back into its barrier.
    ReentrantPostPhase,
}

impl fmt::Display for InvalidOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::AddingCompleted => "collection has been marked as complete for adding",
            Self::NoMoreItems => "collection is completed and empty, no more items will arrive",
            Self::AllCollectionsCompleted => "all collections are marked as complete for adding",
            Self::ContainerRefused => "the underlying collection refused the item",
            Self::ZeroParticipants => "barrier has no participants to wait for",
            Self::ReentrantPostPhase => {
                "barrier operations are not allowed from within its post-phase action"
            }
        };
        f.write_str(message)
    }
}

/// `PostPhaseError` is handed to every participant of a phase whose
/// post-phase action failed. The inner error is shared between them.
#[derive(Debug, Clone)]
pub struct PostPhaseError {
    phase: u64,
    inner: Arc<dyn error::Error + Send + Sync + 'static>,
}

impl PostPhaseError {
    pub(crate) fn new(phase: u64, inner: BoxedError) -> Self {
        Self {
            phase,
            inner: Arc::from(inner),
        }
    }

    /// The phase whose post-phase action failed.
    #[must_use]
    pub fn phase(&self) -> u64 {
        self.phase
    }

    /// The error the post-phase action produced.
    #[must_use]
    pub fn inner(&self) -> &(dyn error::Error + Send + Sync + 'static) {
        self.inner.as_ref()
    }

    /// Returns true when the inner error is of type `E`.
    #[must_use]
    pub fn inner_is<E: error::Error + 'static>(&self) -> bool {
        self.inner.is::<E>()
    }
}

impl fmt::Display for PostPhaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "post-phase action of phase {} failed: {}",
            self.phase, self.inner
        )
    }
}

impl error::Error for PostPhaseError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

/// `PanicError` carries the message of a panicking post-phase action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicError(pub String);

impl error::Error for PanicError {}

impl fmt::Display for PanicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "post-phase action panicked: {}", self.0)
    }
}

#[derive(From, Debug, Clone)]
pub enum ConcurrentError {
    #[from(ignore)]
    InvalidArgument(&'static str),

    #[from(ignore)]
    ArgumentOutOfRange(&'static str),

    InvalidOperation(InvalidOperation),

    #[from(ignore)]
    ObjectDisposed(&'static str),

    #[from(ignore)]
    NotSupported(&'static str),

    PostPhase(PostPhaseError),
}

impl ConcurrentError {
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::ObjectDisposed(_))
    }

    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    #[must_use]
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::ArgumentOutOfRange(_))
    }

    #[must_use]
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported(_))
    }

    /// Returns the reason when this is an `InvalidOperation`.
    #[must_use]
    pub fn invalid_operation(&self) -> Option<InvalidOperation> {
        match self {
            Self::InvalidOperation(reason) => Some(*reason),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_post_phase(&self) -> Option<&PostPhaseError> {
        match self {
            Self::PostPhase(err) => Some(err),
            _ => None,
        }
    }
}

impl Eq for ConcurrentError {}

impl PartialEq for ConcurrentError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidArgument(m1), Self::InvalidArgument(m2))
            | (Self::ArgumentOutOfRange(m1), Self::ArgumentOutOfRange(m2))
            | (Self::ObjectDisposed(m1), Self::ObjectDisposed(m2))
            | (Self::NotSupported(m1), Self::NotSupported(m2)) => m1 == m2,
            (Self::InvalidOperation(r1), Self::InvalidOperation(r2)) => r1 == r2,
            (Self::PostPhase(e1), Self::PostPhase(e2)) => {
                e1.phase == e2.phase && Arc::ptr_eq(&e1.inner, &e2.inner)
            }
            _ => false,
        }
    }
}

impl error::Error for ConcurrentError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::PostPhase(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for ConcurrentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(m) => write!(f, "ConcurrentError::InvalidArgument({m})"),
            Self::ArgumentOutOfRange(m) => write!(f, "ConcurrentError::ArgumentOutOfRange({m})"),
            Self::InvalidOperation(reason) => {
                write!(f, "ConcurrentError::InvalidOperation({reason})")
            }
            Self::ObjectDisposed(m) => write!(f, "ConcurrentError::ObjectDisposed({m})"),
            Self::NotSupported(m) => write!(f, "ConcurrentError::NotSupported({m})"),
            Self::PostPhase(err) => write!(f, "ConcurrentError::PostPhase({err})"),
        }
    }
}
