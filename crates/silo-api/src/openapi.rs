//! OpenAPI documentation generated by utoipa from handler annotations.

use utoipa::OpenApi;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Silo Storage API",
        version = "2026.7.2",
        description = "Disk-backed blob storage with content identification and bucket/object namespace"
    ),
    paths(
        handlers::health,
        handlers::buckets::list_buckets,
        handlers::buckets::create_bucket,
        handlers::buckets::ensure_bucket,
        handlers::buckets::get_bucket,
        handlers::buckets::delete_bucket,
        handlers::objects::list_objects,
        handlers::objects::put_object,
        handlers::objects::post_object_form,
        handlers::objects::get_object,
        handlers::objects::head_object,
        handlers::objects::delete_object,
        handlers::objects::get_object_by_name,
        handlers::objects::head_object_by_name,
        handlers::objects::delete_object_by_name,
        handlers::objects::get_object_global,
        handlers::objects::delete_object_global,
    ),
    components(schemas(
        silo_core::Bucket,
        silo_core::BucketSummary,
        silo_core::CreateBucketRequest,
        silo_core::ObjectResponse,
        silo_core::ObjectListPage,
        silo_core::DetectionMethod,
    )),
    tags(
        (name = "Buckets", description = "Bucket lifecycle"),
        (name = "Objects", description = "Object upload, download, and deletion"),
        (name = "Health", description = "Service probes"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("/api/buckets"));
        assert!(json.contains("/api/objects/{docId}"));
    }
}
