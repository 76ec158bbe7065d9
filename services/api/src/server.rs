use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryApplicationRepository, InMemoryOrganizationRepository, LoggingNotifier,
};
use crate::routes::with_operational_routes;
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use union_registry::config::{AppConfig, DocumentConfig};
use union_registry::error::AppError;
use union_registry::telemetry;
use union_registry::workflows::membership::documents::{
    DocumentPackager, DocumentRenderer, FileSystemStore, GenPdfRenderer, HtmlRenderer,
};
use union_registry::workflows::membership::{membership_router, MembershipService};
use union_registry::workflows::organizations::{organization_router, OrganizationService};
use union_registry::workflows::ErrorDisclosure;

/// PDF output when fonts are configured, standalone HTML otherwise.
pub(crate) fn renderer_for(documents: &DocumentConfig) -> Box<dyn DocumentRenderer> {
    match &documents.font_dir {
        Some(font_dir) => Box::new(GenPdfRenderer::new(
            font_dir.clone(),
            documents.font_family.clone(),
        )),
        None => Box::new(HtmlRenderer),
    }
}

pub(crate) fn build_app(config: &AppConfig, notifier: Arc<LoggingNotifier>) -> Router {
    let disclosure = ErrorDisclosure::for_environment(config.environment);
    let organizations = Arc::new(InMemoryOrganizationRepository::default());
    let applications = Arc::new(InMemoryApplicationRepository::default());
    let packager = DocumentPackager::new(
        renderer_for(&config.documents),
        Box::new(FileSystemStore::new(
            config.documents.output_dir.clone(),
            config.documents.public_url.clone(),
        )),
    );

    let organization_service = Arc::new(OrganizationService::new(organizations.clone()));
    let membership_service = Arc::new(MembershipService::new(
        applications,
        organizations,
        notifier,
        packager,
    ));

    with_operational_routes(
        membership_router(membership_service, disclosure)
            .merge(organization_router(organization_service, disclosure)),
    )
}

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        documents_dir: Arc::new(config.documents.output_dir.clone()),
    };

    tokio::fs::create_dir_all(&config.documents.output_dir).await?;
    let notifier = Arc::new(LoggingNotifier::new(config.mail.sender.clone()));
    let app = build_app(&config, notifier)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        documents = %config.documents.output_dir.display(),
        "union registry ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
