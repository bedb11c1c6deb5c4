use crate::{non_negative, ApiError, ApiJson, ApiPath, ApiQuery, ApiResult, AppState};
use archgraph_core::{Edge, EdgeId, Feature, Node, NodeSummary, Version};
use archgraph_graph::{
    ensure_node_exists, Architecture, ComponentDetail, ComponentPatch, CreateComponent,
    CreateEdge, CreateLayer, DeleteComponent, DeleteEdge, DeleteFeature, DeletedComponent,
    DependencyTreeNode, GetArchitecture, GetComponent, GetDependencyCycles, GetDependencyTree,
    GetDependents, GetImplementationOrder, GetNeighbourhood, GetNextImplementable,
    GetShortestPath, ImplementationOrder, MoveComponent, Neighbourhood, NewComponent, NewEdge,
    NewLayer, ShortestPath, UpdateComponent, UpdateVersion, UploadFeature, VersionUpdate,
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Deserialize)]
pub struct PathQuery {
    pub from: String,
    pub to: String,
}

#[derive(Deserialize)]
pub struct DepthQuery {
    pub depth: Option<i64>,
}

#[derive(Deserialize)]
pub struct HopsQuery {
    pub hops: Option<i64>,
}

#[derive(Deserialize)]
pub struct MoveRequest {
    pub layer: String,
}

#[derive(Deserialize)]
pub struct FeatureUpload {
    pub content: String,
}

#[derive(Serialize)]
pub struct FeatureRemoval {
    pub removed: usize,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn get_architecture(State(state): State<AppState>) -> ApiResult<Json<Architecture>> {
    let repos = &state.repos;
    let architecture = GetArchitecture::new(
        repos.nodes.clone(),
        repos.edges.clone(),
        repos.versions.clone(),
        repos.features.clone(),
    )
    .execute()
    .await?;
    Ok(Json(architecture))
}

pub async fn get_component(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<ComponentDetail>> {
    let detail = GetComponent::new(state.repos.clone()).execute(&id).await?;
    Ok(Json(detail))
}

pub async fn create_component(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewComponent>,
) -> ApiResult<(StatusCode, Json<Node>)> {
    let node = CreateComponent::new(state.repos.clone())
        .with_default_tags(state.default_tags())
        .execute(request)
        .await?;
    Ok((StatusCode::CREATED, Json(node)))
}

pub async fn update_component(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<ComponentPatch>,
) -> ApiResult<Json<Node>> {
    let node = UpdateComponent::new(state.repos.clone())
        .execute(&id, patch)
        .await?;
    Ok(Json(node))
}

pub async fn move_component(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(request): ApiJson<MoveRequest>,
) -> ApiResult<Json<Node>> {
    let node = MoveComponent::new(state.repos.clone())
        .execute(&id, &request.layer)
        .await?;
    Ok(Json(node))
}

pub async fn delete_component(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<DeletedComponent>> {
    let deleted = DeleteComponent::new(state.repos.clone()).execute(&id).await?;
    Ok(Json(deleted))
}

pub async fn create_layer(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewLayer>,
) -> ApiResult<(StatusCode, Json<Node>)> {
    let layer = CreateLayer::new(state.repos.clone()).execute(request).await?;
    Ok((StatusCode::CREATED, Json(layer)))
}

pub async fn create_edge(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewEdge>,
) -> ApiResult<(StatusCode, Json<Edge>)> {
    let edge = CreateEdge::new(state.repos.clone()).execute(request).await?;
    Ok((StatusCode::CREATED, Json(edge)))
}

pub async fn delete_edge(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<EdgeId>,
) -> ApiResult<StatusCode> {
    DeleteEdge::new(state.repos.clone()).execute(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_version(
    State(state): State<AppState>,
    ApiPath((id, version)): ApiPath<(String, String)>,
    ApiJson(update): ApiJson<VersionUpdate>,
) -> ApiResult<Json<Version>> {
    let version = UpdateVersion::new(state.repos.clone())
        .execute(&id, &version, update)
        .await?;
    Ok(Json(version))
}

pub async fn upload_feature(
    State(state): State<AppState>,
    ApiPath((id, version, filename)): ApiPath<(String, String, String)>,
    ApiJson(upload): ApiJson<FeatureUpload>,
) -> ApiResult<Json<Feature>> {
    let feature = UploadFeature::new(state.repos.clone())
        .execute(&id, &version, &filename, &upload.content)
        .await?;
    Ok(Json(feature))
}

pub async fn delete_feature(
    State(state): State<AppState>,
    ApiPath((id, filename)): ApiPath<(String, String)>,
) -> ApiResult<Json<FeatureRemoval>> {
    let removed = DeleteFeature::new(state.repos.clone())
        .execute(&id, &filename)
        .await?;
    Ok(Json(FeatureRemoval { removed }))
}

pub async fn shortest_path(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PathQuery>,
) -> ApiResult<Json<ShortestPath>> {
    if query.from.is_empty() || query.to.is_empty() {
        return Err(ApiError::BadRequest(
            "both 'from' and 'to' are required".to_string(),
        ));
    }
    let path = GetShortestPath::new(state.repos.nodes.clone(), state.repos.edges.clone())
        .execute(&query.from, &query.to)
        .await?;
    Ok(Json(path))
}

pub async fn dependency_tree(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<DepthQuery>,
) -> ApiResult<Json<Vec<DependencyTreeNode>>> {
    ensure_node_exists(state.repos.nodes.as_ref(), &id).await?;
    let Some(depth) = non_negative(query.depth, 1) else {
        return Ok(Json(Vec::new()));
    };
    let tree = GetDependencyTree::new(state.repos.nodes.clone(), state.repos.edges.clone())
        .execute(&id, depth)
        .await?;
    Ok(Json(tree))
}

pub async fn dependents(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Vec<NodeSummary>>> {
    ensure_node_exists(state.repos.nodes.as_ref(), &id).await?;
    let dependents = GetDependents::new(state.repos.nodes.clone(), state.repos.edges.clone())
        .execute(&id)
        .await?;
    Ok(Json(dependents))
}

pub async fn neighbourhood(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<HopsQuery>,
) -> ApiResult<Json<Neighbourhood>> {
    ensure_node_exists(state.repos.nodes.as_ref(), &id).await?;
    let Some(hops) = non_negative(query.hops, 1) else {
        return Ok(Json(Neighbourhood::default()));
    };
    let neighbourhood =
        GetNeighbourhood::new(state.repos.nodes.clone(), state.repos.edges.clone())
            .execute(&id, hops)
            .await?;
    Ok(Json(neighbourhood))
}

pub async fn implementation_order(
    State(state): State<AppState>,
) -> ApiResult<Json<ImplementationOrder>> {
    let order = GetImplementationOrder::new(state.repos.nodes.clone(), state.repos.edges.clone())
        .execute()
        .await?;
    Ok(Json(order))
}

pub async fn dependency_cycles(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Vec<String>>>> {
    let cycles = GetDependencyCycles::new(state.repos.nodes.clone(), state.repos.edges.clone())
        .execute()
        .await?;
    Ok(Json(cycles))
}

pub async fn next_implementable(
    State(state): State<AppState>,
    ApiPath(version): ApiPath<String>,
) -> ApiResult<Json<Vec<NodeSummary>>> {
    let next = GetNextImplementable::new(
        state.repos.nodes.clone(),
        state.repos.edges.clone(),
        state.repos.versions.clone(),
    )
    .execute(&version)
    .await?;
    Ok(Json(next))
}
