use hoplink_core::Error;
use tonic::{Code, Status};

/// Maps the service taxonomy onto gRPC status codes. The gateway
/// translates these further into HTTP statuses.
pub fn to_status(error: Error) -> Status {
    let message = error.to_string();
    let code = match error {
        Error::InvalidInput(_) => Code::InvalidArgument,
        Error::NotFound => Code::NotFound,
        Error::Unauthorized => Code::PermissionDenied,
        Error::AliasTaken(_) => Code::AlreadyExists,
        Error::ExhaustedCodeSpace(_) => Code::ResourceExhausted,
        Error::InvalidTarget(_) => Code::FailedPrecondition,
        Error::Unavailable(_) => Code::Unavailable,
    };
    Status::new(code, message)
}
