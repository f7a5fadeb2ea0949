//! Wire schema and conversions for the Hoplink internal RPCs.

mod convert;

pub mod shortener {
    pub mod v1 {
        tonic::include_proto!("shortener.v1");
    }
}

pub mod resolver {
    pub mod v1 {
        tonic::include_proto!("resolver.v1");
    }
}

pub mod analytics {
    pub mod v1 {
        tonic::include_proto!("analytics.v1");
    }
}

pub use convert::ConversionError;
