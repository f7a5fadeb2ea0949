use crate::error::to_status;
use hoplink_core::repository::ResolverStore;
use hoplink_core::EventPublisher;
use hoplink_proto::resolver::v1 as proto;
use hoplink_proto::resolver::v1::resolver_service_server::ResolverService as ResolverRpc;
use hoplink_resolver::{ClientInfo, Resolution, ResolverService};
use jiff::Timestamp;
use tonic::{Request, Response, Status};

pub struct ResolverGrpcServer<S, P> {
    service: ResolverService<S, P>,
    service_name: String,
    service_version: String,
}

impl<S, P> ResolverGrpcServer<S, P>
where
    S: ResolverStore,
    P: EventPublisher,
{
    pub fn new(
        service: ResolverService<S, P>,
        service_name: String,
        service_version: String,
    ) -> Self {
        Self {
            service,
            service_name,
            service_version,
        }
    }
}

#[tonic::async_trait]
impl<S, P> ResolverRpc for ResolverGrpcServer<S, P>
where
    S: ResolverStore,
    P: EventPublisher,
{
    async fn resolve(
        &self,
        request: Request<proto::ResolveRequest>,
    ) -> Result<Response<proto::ResolveResponse>, Status> {
        let request = request.into_inner();
        let client = ClientInfo {
            client_address: request.client_address,
            user_agent: request.user_agent,
            referrer: request.referrer,
        };

        let resolution = self
            .service
            .resolve(&request.short_code, client)
            .await
            .map_err(to_status)?;

        let response = match resolution {
            Resolution::Found {
                long_url,
                click_count,
            } => proto::ResolveResponse {
                found: true,
                expired: false,
                long_url,
                click_count: click_count as i64,
            },
            Resolution::NotFound => proto::ResolveResponse {
                found: false,
                expired: false,
                long_url: String::new(),
                click_count: 0,
            },
            Resolution::Expired => proto::ResolveResponse {
                found: true,
                expired: true,
                long_url: String::new(),
                click_count: 0,
            },
        };

        Ok(Response::new(response))
    }

    async fn track_click(
        &self,
        request: Request<proto::TrackClickRequest>,
    ) -> Result<Response<proto::TrackClickResponse>, Status> {
        let request = request.into_inner();
        let client = ClientInfo {
            client_address: request.client_address,
            user_agent: request.user_agent,
            referrer: request.referrer,
        };

        let (event, published) = self
            .service
            .track_click(&request.short_code, &request.long_url, client)
            .await
            .map_err(to_status)?;

        Ok(Response::new(proto::TrackClickResponse {
            published,
            session_id: event.session_id,
        }))
    }

    async fn health(
        &self,
        _request: Request<proto::HealthRequest>,
    ) -> Result<Response<proto::HealthResponse>, Status> {
        Ok(Response::new(proto::HealthResponse {
            status: "ok".to_string(),
            service: self.service_name.clone(),
            version: self.service_version.clone(),
            timestamp: Timestamp::now().as_second(),
        }))
    }
}
