use std::sync::Arc;

use crate::core::config::{AppConfig, AppPaths, CheckpointBackend};
use crate::graph::{
    build_claims_graph, CheckpointStore, GraphService, InMemoryCheckpointStore,
    SqliteCheckpointStore,
};
use crate::llm::{build_provider, LlmProvider};
use crate::rag::{
    AnswerAssembler, DocumentLoader, Indexer, Retriever, SqliteVectorStore, VectorRetriever,
    VectorStore,
};
use crate::tools::Toolbox;

pub mod error;

use error::InitializationError;

/// Process-wide state shared by every route.
///
/// Built once in `main` and handed to the router; nothing in the crate keeps
/// its own global client or index.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: Arc<AppConfig>,
    pub llm: Arc<dyn LlmProvider>,
    pub store: Arc<dyn VectorStore>,
    pub assembler: Arc<AnswerAssembler>,
    pub graph: Arc<GraphService>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// 1. Builds the LLM provider from `llm` settings
    /// 2. Opens the SQLite vector index and, if enabled, builds it from the
    ///    document directory when it is empty or stale
    /// 3. Opens the conversation checkpoint store
    /// 4. Wires retriever, assembler and graph together
    pub async fn initialize(
        config: AppConfig,
        paths: Arc<AppPaths>,
    ) -> Result<Arc<Self>, InitializationError> {
        let llm = build_provider(&config.llm).map_err(|e| InitializationError::Llm(e.into()))?;

        let index_dir = paths.resolve(&config.rag.index_dir);
        let store: Arc<dyn VectorStore> = Arc::new(
            SqliteVectorStore::open_dir(&index_dir)
                .await
                .map_err(|e| InitializationError::Rag(e.into()))?,
        );
        tracing::info!("Vector index at {}", index_dir.display());

        if config.rag.build_on_startup {
            let indexer = Indexer::from_config(&config, llm.clone(), store.clone());
            let loader = DocumentLoader::new(paths.resolve(&config.rag.data_dir))
                .relative_to(&paths.project_root);
            if let Err(e) = indexer.ensure_built(&loader).await {
                tracing::warn!("Index build on startup failed, serving existing index: {}", e);
            }
        }

        let checkpoints: Arc<dyn CheckpointStore> = match config.graph.checkpoint {
            CheckpointBackend::Sqlite => Arc::new(
                SqliteCheckpointStore::new(paths.checkpoint_db_path.clone())
                    .await
                    .map_err(|e| InitializationError::Checkpoint(e.into()))?,
            ),
            CheckpointBackend::Memory => Arc::new(InMemoryCheckpointStore::new()),
        };

        Self::from_parts(config, paths, llm, store, checkpoints)
    }

    /// Wires already constructed collaborators together.
    pub fn from_parts(
        config: AppConfig,
        paths: Arc<AppPaths>,
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn VectorStore>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Result<Arc<Self>, InitializationError> {
        let retriever: Arc<dyn Retriever> =
            Arc::new(VectorRetriever::new(llm.clone(), store.clone()));

        let assembler = Arc::new(AnswerAssembler::new(
            retriever.clone(),
            llm.clone(),
            config.rag.acceptance_threshold,
        ));

        let runtime = build_claims_graph(config.graph.max_steps)
            .map_err(|e| InitializationError::Graph(e.into()))?;
        let tools = Toolbox::new(
            retriever,
            config.graph.retriever_k,
            config.graph.retriever_score_threshold,
        );
        let graph = Arc::new(GraphService::new(
            runtime,
            llm.clone(),
            tools,
            checkpoints,
            config.llm.temperature,
        ));

        Ok(Arc::new(AppState {
            paths,
            config: Arc::new(config),
            llm,
            store,
            assembler,
            graph,
        }))
    }
}
