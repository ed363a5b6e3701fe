//! Product endpoint handlers

use axum::{
  extract::{Extension, Json, Query, State},
  http::StatusCode,
  response::Json as ResponseJson,
};
use std::sync::Arc;

use crate::engine::QueryEngine;
use crate::server::handlers::{engine_failure, failure, Failure};
use crate::server::middleware::RequestContext;
use crate::server::types::{
  AnswerResponse, BaseResponse, CompareProductsRequest, GetProductRequest, GetProductResponse,
  ListProductsParams, ListProductsResponse, ProductData, ProductsResponse,
  SearchProductsRequest, SimilarProductsRequest, StatsResponse, DEFAULT_SEARCH_LIMIT,
};

fn not_found(model_name: &str, context: &RequestContext) -> Failure {
  context.log_warn(&format!("product not found: {model_name}"));
  failure(
    StatusCode::NOT_FOUND,
    "product_not_found",
    &format!("Product '{model_name}' was not found in the catalog"),
    context.request_id,
  )
}

/// POST /products/get - Full spec sheet for one model
pub async fn get_product(
  State(engine): State<Arc<QueryEngine>>,
  Extension(context): Extension<RequestContext>,
  Json(request): Json<GetProductRequest>,
) -> Result<ResponseJson<BaseResponse<GetProductResponse>>, Failure> {
  match engine.get_product(&request.model_name).await {
    Ok(Some(hit)) => {
      let response = GetProductResponse { product: ProductData::from(&hit) };
      Ok(ResponseJson(BaseResponse::success(response, context.request_id)))
    }
    Ok(None) => Err(not_found(&request.model_name, &context)),
    Err(e) => {
      context.log_error(&format!("lookup failed: {e}"));
      Err(engine_failure(&e, context.request_id))
    }
  }
}

/// POST /products/similar - Nearest neighbours of a reference model
pub async fn similar_products(
  State(engine): State<Arc<QueryEngine>>,
  Extension(context): Extension<RequestContext>,
  Json(request): Json<SimilarProductsRequest>,
) -> Result<ResponseJson<BaseResponse<ProductsResponse>>, Failure> {
  let reference = match engine.get_product(&request.model_name).await {
    Ok(Some(hit)) => hit,
    Ok(None) => return Err(not_found(&request.model_name, &context)),
    Err(e) => return Err(engine_failure(&e, context.request_id)),
  };

  let results = engine
    .find_similar(reference.model_name(), request.limit)
    .await
    .map_err(|e| engine_failure(&e, context.request_id))?;

  let products: Vec<ProductData> = results.iter().map(ProductData::from).collect();
  let response = ProductsResponse { count: products.len(), products };
  Ok(ResponseJson(BaseResponse::success(response, context.request_id)))
}

/// POST /products/search - Filtered semantic search with explicit predicates
pub async fn search_products(
  State(engine): State<Arc<QueryEngine>>,
  Extension(context): Extension<RequestContext>,
  Json(request): Json<SearchProductsRequest>,
) -> Result<ResponseJson<BaseResponse<ProductsResponse>>, Failure> {
  if request.query.trim().is_empty() {
    return Err(failure(
      StatusCode::BAD_REQUEST,
      "empty_query",
      "Query text is required",
      context.request_id,
    ));
  }

  let filter = request.filter();
  if let (Some(min), Some(max)) = (filter.min_watts, filter.max_watts) {
    if min > max {
      return Err(failure(
        StatusCode::BAD_REQUEST,
        "invalid_filter",
        &format!("min_watts ({min}) is greater than max_watts ({max})"),
        context.request_id,
      ));
    }
  }

  let limit = request.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
  let results = engine
    .search_products(&request.query, Some(filter), Some(limit))
    .await
    .map_err(|e| {
      context.log_error(&format!("search failed: {e}"));
      engine_failure(&e, context.request_id)
    })?;

  let products: Vec<ProductData> = results.iter().map(ProductData::from).collect();
  let response = ProductsResponse { count: products.len(), products };
  Ok(ResponseJson(BaseResponse::success(response, context.request_id)))
}

/// POST /products/compare - Side-by-side table of two or more models
pub async fn compare_products(
  State(engine): State<Arc<QueryEngine>>,
  Extension(context): Extension<RequestContext>,
  Json(request): Json<CompareProductsRequest>,
) -> Result<ResponseJson<BaseResponse<AnswerResponse>>, Failure> {
  if request.model_names.len() < 2 {
    return Err(failure(
      StatusCode::BAD_REQUEST,
      "too_few_models",
      "Provide at least two model names to compare",
      context.request_id,
    ));
  }

  let answer = engine
    .compare(&request.model_names)
    .await
    .map_err(|e| engine_failure(&e, context.request_id))?;
  Ok(ResponseJson(BaseResponse::success(AnswerResponse::from(&answer), context.request_id)))
}

/// GET /products/list - Model names, optionally limited to one category
pub async fn list_products(
  State(engine): State<Arc<QueryEngine>>,
  Extension(context): Extension<RequestContext>,
  Query(params): Query<ListProductsParams>,
) -> Result<ResponseJson<BaseResponse<ListProductsResponse>>, Failure> {
  let models: Vec<String> = match params.category.as_deref() {
    Some(category) => engine
      .browse_category(category, params.limit.unwrap_or(usize::MAX))
      .await
      .map(|results| results.into_iter().map(|r| r.record.model_name).collect()),
    None => engine.list_models().await.map(|mut names: Vec<String>| {
      if let Some(limit) = params.limit {
        names.truncate(limit);
      }
      names
    }),
  }
  .map_err(|e| engine_failure(&e, context.request_id))?;

  let response = ListProductsResponse { count: models.len(), models };
  Ok(ResponseJson(BaseResponse::success(response, context.request_id)))
}

/// GET /products/stats - Catalog counts
pub async fn catalog_stats(
  State(engine): State<Arc<QueryEngine>>,
  Extension(context): Extension<RequestContext>,
) -> Result<ResponseJson<BaseResponse<StatsResponse>>, Failure> {
  let stats = engine.stats().await.map_err(|e| engine_failure(&e, context.request_id))?;
  Ok(ResponseJson(BaseResponse::success(StatsResponse::from(stats), context.request_id)))
}
