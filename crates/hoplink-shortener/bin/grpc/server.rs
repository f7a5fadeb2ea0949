use crate::error::to_status;
use hoplink_core::mapping::{MappingPatch, OwnerQuery, SortBy, SortOrder};
use hoplink_core::UrlCache;
use hoplink_core::repository::Repository;
use hoplink_proto::shortener::v1 as proto;
use hoplink_proto::shortener::v1::shortener_service_server::ShortenerService as ShortenerRpc;
use hoplink_shortener::{CodeMinter, ShortenParams, ShortenerService};
use jiff::Timestamp;
use tonic::{Request, Response, Status};

pub struct ShortenerGrpcServer<R, C, M> {
    service: ShortenerService<R, C, M>,
    service_name: String,
    service_version: String,
}

impl<R, C, M> ShortenerGrpcServer<R, C, M>
where
    R: Repository,
    C: UrlCache,
    M: CodeMinter,
{
    pub fn new(
        service: ShortenerService<R, C, M>,
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

fn parse_sort_by(value: &str) -> Result<SortBy, Status> {
    match value {
        "" | "created_at" => Ok(SortBy::CreatedAt),
        "click_count" => Ok(SortBy::ClickCount),
        other => Err(Status::invalid_argument(format!(
            "sort_by must be 'created_at' or 'click_count', got '{other}'"
        ))),
    }
}

fn parse_sort_order(value: &str) -> Result<SortOrder, Status> {
    match value {
        "" | "desc" => Ok(SortOrder::Desc),
        "asc" => Ok(SortOrder::Asc),
        other => Err(Status::invalid_argument(format!(
            "sort_order must be 'asc' or 'desc', got '{other}'"
        ))),
    }
}

fn parse_expiry(expires_at: Option<i64>) -> Result<Option<Timestamp>, Status> {
    expires_at
        .map(|seconds| {
            Timestamp::from_second(seconds).map_err(|e| {
                Status::invalid_argument(format!("invalid expires_at '{seconds}': {e}"))
            })
        })
        .transpose()
}

#[tonic::async_trait]
impl<R, C, M> ShortenerRpc for ShortenerGrpcServer<R, C, M>
where
    R: Repository,
    C: UrlCache,
    M: CodeMinter,
{
    async fn shorten(
        &self,
        request: Request<proto::ShortenRequest>,
    ) -> Result<Response<proto::ShortenResponse>, Status> {
        let request = request.into_inner();

        let params = ShortenParams {
            long_url: request.long_url,
            owner_id: request.owner_id,
            custom_alias: request.custom_alias,
            expires_at: parse_expiry(request.expires_at)?,
            metadata: request.metadata.into_iter().collect(),
        };

        let mapping = self.service.shorten(params).await.map_err(to_status)?;

        Ok(Response::new(proto::ShortenResponse {
            short_code: mapping.short_code.to_string(),
            created_at: mapping.created_at.as_second(),
            expires_at: mapping.expires_at.map(|ts| ts.as_second()),
        }))
    }

    async fn get_info(
        &self,
        request: Request<proto::GetInfoRequest>,
    ) -> Result<Response<proto::GetInfoResponse>, Status> {
        let request = request.into_inner();

        let mapping = self
            .service
            .get_info(&request.short_code, &request.owner_id)
            .await
            .map_err(to_status)?;

        Ok(Response::new(proto::GetInfoResponse {
            mapping: Some((&mapping).into()),
        }))
    }

    async fn list_by_owner(
        &self,
        request: Request<proto::ListByOwnerRequest>,
    ) -> Result<Response<proto::ListByOwnerResponse>, Status> {
        let request = request.into_inner();

        let query = OwnerQuery::new(
            request.page,
            request.page_size,
            parse_sort_by(&request.sort_by)?,
            parse_sort_order(&request.sort_order)?,
        )
        .map_err(to_status)?;

        let page = self
            .service
            .list_by_owner(&request.owner_id, query)
            .await
            .map_err(to_status)?;

        Ok(Response::new(proto::ListByOwnerResponse {
            mappings: page.items.iter().map(Into::into).collect(),
            has_next: page.has_next,
            page: query.page,
            page_size: query.page_size,
        }))
    }

    async fn update(
        &self,
        request: Request<proto::UpdateRequest>,
    ) -> Result<Response<proto::UpdateResponse>, Status> {
        let request = request.into_inner();

        let patch = MappingPatch {
            long_url: request.long_url,
            expires_at: parse_expiry(request.expires_at)?,
            metadata: request
                .metadata
                .map(|patch| patch.entries.into_iter().collect()),
        };

        let mapping = self
            .service
            .update(&request.short_code, &request.owner_id, patch)
            .await
            .map_err(to_status)?;

        Ok(Response::new(proto::UpdateResponse {
            mapping: Some((&mapping).into()),
        }))
    }

    async fn delete(
        &self,
        request: Request<proto::DeleteRequest>,
    ) -> Result<Response<proto::DeleteResponse>, Status> {
        let request = request.into_inner();

        self.service
            .delete(&request.short_code, &request.owner_id)
            .await
            .map_err(to_status)?;

        Ok(Response::new(proto::DeleteResponse { deleted: true }))
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
