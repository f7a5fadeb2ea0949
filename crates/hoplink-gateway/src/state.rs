use hoplink_proto::analytics::v1::analytics_service_client::AnalyticsServiceClient;
use hoplink_proto::resolver::v1::resolver_service_client::ResolverServiceClient;
use hoplink_proto::shortener::v1::shortener_service_client::ShortenerServiceClient;
use tonic::transport::Channel;
use typed_builder::TypedBuilder;

/// Shared state handed to every handler. The gRPC clients multiplex
/// over one channel each and are cheap to clone per request.
#[derive(Clone, TypedBuilder)]
pub struct AppState {
    pub shortener: ShortenerServiceClient<Channel>,
    pub resolver: ResolverServiceClient<Channel>,
    pub analytics: AnalyticsServiceClient<Channel>,
    /// Public base URL used to render short links in responses.
    pub base_url: String,
    pub service_name: String,
    pub service_version: String,
}
