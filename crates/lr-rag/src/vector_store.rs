//! Vector store implementations

use async_trait::async_trait;
use qdrant_client::Payload;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    GetPointsBuilder, PointId, PointStruct, ScrollPointsBuilder, SearchPointsBuilder,
    UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use lr_core::{
    ContentFilter, Course, CourseChunk, Embedder, Error, Lesson, Result, SearchHit,
    SearchResults, VectorStore,
};

use crate::embedder::cosine_similarity;

/// Pick a catalog title by case-insensitive containment before falling back
/// to vector similarity
fn match_title_by_name(titles: &[String], course_name: &str) -> Option<String> {
    let needle = course_name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    titles
        .iter()
        .find(|t| t.to_lowercase() == needle)
        .or_else(|| titles.iter().find(|t| t.to_lowercase().contains(&needle)))
        .cloned()
}

/// Deterministic point id so re-ingesting a chunk overwrites it
fn point_uuid(key: &str) -> String {
    Uuid::from_bytes(md5::compute(key.as_bytes()).0).to_string()
}

fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.course_title.cmp(&b.course_title))
            .then_with(|| a.chunk_index.cmp(&b.chunk_index))
    });
}

struct CatalogEntry {
    course: Course,
    embedding: Vec<f32>,
}

struct ContentEntry {
    chunk: CourseChunk,
    embedding: Vec<f32>,
}

/// Local in-memory vector store implementation
pub struct LocalVectorStore {
    embedder: Arc<dyn Embedder>,
    catalog: RwLock<BTreeMap<String, CatalogEntry>>,
    content: RwLock<BTreeMap<String, ContentEntry>>,
}

impl LocalVectorStore {
    /// Create a new local vector store
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            catalog: RwLock::new(BTreeMap::new()),
            content: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored content chunks
    pub fn chunk_count(&self) -> Result<usize> {
        let content = self
            .content
            .read()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;
        Ok(content.len())
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn add_course_metadata(&self, course: &Course) -> Result<()> {
        let embedding = self.embedder.embed(&course.title).await?;
        let mut catalog = self
            .catalog
            .write()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;
        catalog.insert(
            course.title.clone(),
            CatalogEntry {
                course: course.clone(),
                embedding,
            },
        );
        Ok(())
    }

    async fn add_course_content(&self, chunks: &[CourseChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let mut content = self
            .content
            .write()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            content.insert(
                chunk.key(),
                ContentEntry {
                    chunk: chunk.clone(),
                    embedding,
                },
            );
        }
        Ok(())
    }

    async fn delete_course_content(&self, course_title: &str) -> Result<()> {
        let mut content = self
            .content
            .write()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;
        content.retain(|_, entry| entry.chunk.course_title != course_title);
        Ok(())
    }

    async fn resolve_course_name(&self, course_name: &str) -> Result<Option<String>> {
        let titles = self.course_titles().await?;
        if let Some(title) = match_title_by_name(&titles, course_name) {
            return Ok(Some(title));
        }

        let query = self.embedder.embed(course_name).await?;
        let catalog = self
            .catalog
            .read()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;

        Ok(catalog
            .values()
            .map(|entry| (cosine_similarity(&query, &entry.embedding), &entry.course.title))
            .filter(|(score, _)| *score > 0.0)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, title)| title.clone()))
    }

    async fn query_content(
        &self,
        query: &str,
        filter: &ContentFilter,
        limit: usize,
    ) -> Result<SearchResults> {
        let query_vector = self.embedder.embed(query).await?;
        let content = self
            .content
            .read()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;

        let mut hits: Vec<SearchHit> = content
            .values()
            .filter(|entry| {
                filter
                    .course_title
                    .as_ref()
                    .is_none_or(|t| &entry.chunk.course_title == t)
            })
            .filter(|entry| {
                filter
                    .lesson_number
                    .is_none_or(|n| entry.chunk.lesson_number == Some(n))
            })
            .map(|entry| SearchHit {
                text: entry.chunk.text.clone(),
                course_title: entry.chunk.course_title.clone(),
                lesson_number: entry.chunk.lesson_number,
                chunk_index: entry.chunk.chunk_index,
                score: cosine_similarity(&query_vector, &entry.embedding),
            })
            .collect();

        sort_hits(&mut hits);
        hits.truncate(limit);

        Ok(SearchResults { hits })
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        let catalog = self
            .catalog
            .read()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;
        Ok(catalog.keys().cloned().collect())
    }

    async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>> {
        let catalog = self
            .catalog
            .read()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;
        Ok(catalog
            .get(course_title)
            .and_then(|entry| entry.course.lesson(lesson_number))
            .and_then(|lesson| lesson.lesson_link.clone()))
    }

    async fn clear(&self) -> Result<()> {
        self.catalog
            .write()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?
            .clear();
        self.content
            .write()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?
            .clear();
        Ok(())
    }
}

fn payload_str(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    match payload.get(key) {
        Some(Value {
            kind: Some(Kind::StringValue(s)),
        }) => Some(s.clone()),
        _ => None,
    }
}

fn payload_int(payload: &HashMap<String, Value>, key: &str) -> Option<i64> {
    match payload.get(key) {
        Some(Value {
            kind: Some(Kind::IntegerValue(i)),
        }) => Some(*i),
        _ => None,
    }
}

fn course_from_payload(payload: &HashMap<String, Value>) -> Result<Option<Course>> {
    let Some(title) = payload_str(payload, "title") else {
        return Ok(None);
    };
    let lessons: Vec<Lesson> = match payload_str(payload, "lessons_json") {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| Error::Serialization(e.to_string()))?,
        None => Vec::new(),
    };
    Ok(Some(Course {
        title,
        course_link: payload_str(payload, "course_link"),
        instructor: payload_str(payload, "instructor"),
        lessons,
    }))
}

/// Qdrant vector store implementation
///
/// Embeddings come from the injected [`Embedder`]; similarity ranking and
/// filtering are Qdrant's.
pub struct QdrantVectorStore {
    client: Qdrant,
    embedder: Arc<dyn Embedder>,
    catalog_collection: String,
    content_collection: String,
}

impl QdrantVectorStore {
    /// Connect to Qdrant and create the catalog and content collections if missing
    pub async fn connect(
        qdrant_url: &str,
        collection_prefix: &str,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let client = Qdrant::from_url(qdrant_url)
            .build()
            .map_err(|e| Error::VectorStore(e.to_string()))?;

        let store = Self {
            client,
            embedder,
            catalog_collection: format!("{}_course_catalog", collection_prefix),
            content_collection: format!("{}_course_content", collection_prefix),
        };
        store.ensure_collections().await?;

        info!(url = qdrant_url, "Connected to Qdrant");
        Ok(store)
    }

    async fn ensure_collections(&self) -> Result<()> {
        for name in [&self.catalog_collection, &self.content_collection] {
            let exists = self
                .client
                .collection_exists(name.as_str())
                .await
                .map_err(|e| Error::VectorStore(e.to_string()))?;

            if !exists {
                self.client
                    .create_collection(CreateCollectionBuilder::new(name.as_str()).vectors_config(
                        VectorParamsBuilder::new(self.embedder.dimension() as u64, Distance::Cosine),
                    ))
                    .await
                    .map_err(|e| Error::VectorStore(e.to_string()))?;
                info!("Created Qdrant collection: {}", name);
            }
        }
        Ok(())
    }

    async fn get_course(&self, course_title: &str) -> Result<Option<Course>> {
        let ids: Vec<PointId> = vec![point_uuid(course_title).into()];
        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(self.catalog_collection.as_str(), ids).with_payload(true),
            )
            .await
            .map_err(|e| Error::VectorStore(e.to_string()))?;

        match response.result.first() {
            Some(point) => course_from_payload(&point.payload),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn add_course_metadata(&self, course: &Course) -> Result<()> {
        let embedding = self.embedder.embed(&course.title).await?;
        let lessons_json =
            serde_json::to_string(&course.lessons).map_err(|e| Error::Serialization(e.to_string()))?;

        let payload = Payload::try_from(json!({
            "title": course.title,
            "instructor": course.instructor,
            "course_link": course.course_link,
            "lesson_count": course.lessons.len(),
            "lessons_json": lessons_json,
        }))
        .map_err(|e| Error::Serialization(e.to_string()))?;

        let point = PointStruct::new(point_uuid(&course.title), embedding, payload);
        self.client
            .upsert_points(UpsertPointsBuilder::new(self.catalog_collection.as_str(), vec![point]).wait(true))
            .await
            .map_err(|e| Error::VectorStore(e.to_string()))?;

        debug!(course = %course.title, "Stored course metadata");
        Ok(())
    }

    async fn add_course_content(&self, chunks: &[CourseChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let mut points = Vec::with_capacity(chunks.len());
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            let payload = Payload::try_from(json!({
                "text": chunk.text,
                "course_title": chunk.course_title,
                "lesson_number": chunk.lesson_number,
                "chunk_index": chunk.chunk_index,
            }))
            .map_err(|e| Error::Serialization(e.to_string()))?;
            points.push(PointStruct::new(point_uuid(&chunk.key()), embedding, payload));
        }

        self.client
            .upsert_points(UpsertPointsBuilder::new(self.content_collection.as_str(), points).wait(true))
            .await
            .map_err(|e| Error::VectorStore(e.to_string()))?;

        debug!(chunks = chunks.len(), "Stored course content");
        Ok(())
    }

    async fn delete_course_content(&self, course_title: &str) -> Result<()> {
        self.client
            .delete_points(
                DeletePointsBuilder::new(self.content_collection.as_str())
                    .points(Filter::must([Condition::matches(
                        "course_title",
                        course_title.to_string(),
                    )]))
                    .wait(true),
            )
            .await
            .map_err(|e| Error::VectorStore(e.to_string()))?;

        debug!(course = course_title, "Deleted course content");
        Ok(())
    }

    async fn resolve_course_name(&self, course_name: &str) -> Result<Option<String>> {
        let titles = self.course_titles().await?;
        if let Some(title) = match_title_by_name(&titles, course_name) {
            return Ok(Some(title));
        }

        let vector = self.embedder.embed(course_name).await?;
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(self.catalog_collection.as_str(), vector, 1).with_payload(true),
            )
            .await
            .map_err(|e| Error::VectorStore(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .find(|point| point.score > 0.0)
            .and_then(|point| payload_str(&point.payload, "title")))
    }

    async fn query_content(
        &self,
        query: &str,
        filter: &ContentFilter,
        limit: usize,
    ) -> Result<SearchResults> {
        let vector = self.embedder.embed(query).await?;

        let mut conditions = Vec::new();
        if let Some(ref title) = filter.course_title {
            conditions.push(Condition::matches("course_title", title.clone()));
        }
        if let Some(n) = filter.lesson_number {
            conditions.push(Condition::matches("lesson_number", i64::from(n)));
        }

        let mut request =
            SearchPointsBuilder::new(self.content_collection.as_str(), vector, limit as u64)
                .with_payload(true);
        if !conditions.is_empty() {
            request = request.filter(Filter::must(conditions));
        }

        let response = self
            .client
            .search_points(request)
            .await
            .map_err(|e| Error::VectorStore(e.to_string()))?;

        let mut hits: Vec<SearchHit> = response
            .result
            .into_iter()
            .map(|point| SearchHit {
                text: payload_str(&point.payload, "text").unwrap_or_default(),
                course_title: payload_str(&point.payload, "course_title").unwrap_or_default(),
                lesson_number: payload_int(&point.payload, "lesson_number")
                    .and_then(|n| u32::try_from(n).ok()),
                chunk_index: payload_int(&point.payload, "chunk_index")
                    .and_then(|n| usize::try_from(n).ok())
                    .unwrap_or_default(),
                score: point.score,
            })
            .collect();
        sort_hits(&mut hits);

        Ok(SearchResults { hits })
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        let mut titles = Vec::new();
        let mut offset: Option<PointId> = None;

        loop {
            let mut request = ScrollPointsBuilder::new(self.catalog_collection.as_str())
                .limit(256)
                .with_payload(true);
            if let Some(next) = offset.take() {
                request = request.offset(next);
            }

            let response = self
                .client
                .scroll(request)
                .await
                .map_err(|e| Error::VectorStore(e.to_string()))?;

            titles.extend(
                response
                    .result
                    .iter()
                    .filter_map(|point| payload_str(&point.payload, "title")),
            );

            match response.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        titles.sort();
        Ok(titles)
    }

    async fn course_count(&self) -> Result<usize> {
        let response = self
            .client
            .count(CountPointsBuilder::new(self.catalog_collection.as_str()).exact(true))
            .await
            .map_err(|e| Error::VectorStore(e.to_string()))?;
        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }

    async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>> {
        Ok(self
            .get_course(course_title)
            .await?
            .and_then(|course| course.lesson(lesson_number).and_then(|l| l.lesson_link.clone())))
    }

    async fn clear(&self) -> Result<()> {
        for name in [&self.catalog_collection, &self.content_collection] {
            self.client
                .delete_collection(name.as_str())
                .await
                .map_err(|e| Error::VectorStore(e.to_string()))?;
        }
        self.ensure_collections().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashEmbedder;

    fn chunk(course: &str, lesson: Option<u32>, index: usize, text: &str) -> CourseChunk {
        CourseChunk {
            text: text.to_string(),
            course_title: course.to_string(),
            lesson_number: lesson,
            chunk_index: index,
        }
    }

    async fn seeded_store() -> LocalVectorStore {
        let store = LocalVectorStore::new(Arc::new(HashEmbedder::default()));

        let mut mcp = Course::new("MCP: Build Rich-Context AI Apps with Anthropic");
        mcp.lessons.push(Lesson {
            lesson_number: 1,
            title: "Why MCP".to_string(),
            lesson_link: Some("https://example.com/mcp/1".to_string()),
        });
        store.add_course_metadata(&mcp).await.unwrap();
        store
            .add_course_metadata(&Course::new("Prompt Compression and Query Optimization"))
            .await
            .unwrap();

        store
            .add_course_content(&[
                chunk(&mcp.title, Some(1), 0, "MCP servers expose tools and resources to clients."),
                chunk(&mcp.title, Some(2), 1, "Clients connect to servers over stdio transport."),
                chunk(
                    "Prompt Compression and Query Optimization",
                    Some(1),
                    0,
                    "Vector search with projections reduces the fields returned.",
                ),
            ])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_local_vector_store() {
        let store = seeded_store().await;
        assert_eq!(store.course_count().await.unwrap(), 2);
        assert_eq!(store.chunk_count().unwrap(), 3);

        let results = store
            .query_content("MCP servers tools", &ContentFilter::default(), 2)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.hits[0].text.contains("MCP servers"));
    }

    #[tokio::test]
    async fn test_filters_by_course_and_lesson() {
        let store = seeded_store().await;
        let filter = ContentFilter {
            course_title: Some("MCP: Build Rich-Context AI Apps with Anthropic".to_string()),
            lesson_number: Some(2),
        };

        let results = store.query_content("servers", &filter, 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results.hits[0].lesson_number, Some(2));
    }

    #[tokio::test]
    async fn test_resolve_course_name() {
        let store = seeded_store().await;
        assert_eq!(
            store.resolve_course_name("mcp").await.unwrap().as_deref(),
            Some("MCP: Build Rich-Context AI Apps with Anthropic")
        );
        assert_eq!(
            store.resolve_course_name("query optimization").await.unwrap().as_deref(),
            Some("Prompt Compression and Query Optimization")
        );

        let empty = LocalVectorStore::new(Arc::new(HashEmbedder::default()));
        assert_eq!(empty.resolve_course_name("mcp").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reingest_overwrites() {
        let store = seeded_store().await;
        store
            .add_course_content(&[chunk(
                "MCP: Build Rich-Context AI Apps with Anthropic",
                Some(1),
                0,
                "MCP servers expose tools and resources to clients.",
            )])
            .await
            .unwrap();
        assert_eq!(store.chunk_count().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_delete_course_content_keeps_other_courses() {
        let store = seeded_store().await;
        store
            .delete_course_content("MCP: Build Rich-Context AI Apps with Anthropic")
            .await
            .unwrap();

        assert_eq!(store.chunk_count().unwrap(), 1);
        assert_eq!(store.course_count().await.unwrap(), 2);
        let results = store
            .query_content("servers", &ContentFilter::default(), 5)
            .await
            .unwrap();
        assert!(results
            .hits
            .iter()
            .all(|hit| hit.course_title == "Prompt Compression and Query Optimization"));
    }

    #[tokio::test]
    async fn test_similar_titles_do_not_share_chunks() {
        let store = LocalVectorStore::new(Arc::new(HashEmbedder::default()));
        store
            .add_course_content(&[
                chunk("Intro B", None, 0, "Spaced title."),
                chunk("Intro_B", None, 0, "Underscored title."),
            ])
            .await
            .unwrap();
        assert_eq!(store.chunk_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_lesson_link_and_clear() {
        let store = seeded_store().await;
        assert_eq!(
            store
                .lesson_link("MCP: Build Rich-Context AI Apps with Anthropic", 1)
                .await
                .unwrap()
                .as_deref(),
            Some("https://example.com/mcp/1")
        );
        assert_eq!(store.lesson_link("Unknown", 1).await.unwrap(), None);

        store.clear().await.unwrap();
        assert_eq!(store.course_count().await.unwrap(), 0);
        assert_eq!(store.chunk_count().unwrap(), 0);
    }

    #[test]
    fn test_point_uuid_is_deterministic() {
        assert_eq!(point_uuid("Course_1"), point_uuid("Course_1"));
        assert_ne!(point_uuid("Course_1"), point_uuid("Course_2"));
        assert!(Uuid::parse_str(&point_uuid("Course_1")).is_ok());
    }

    #[tokio::test]
    async fn test_qdrant_store_connection() {
        // Skip test if Qdrant is not available
        let store = QdrantVectorStore::connect(
            "http://localhost:6334",
            "lessonrag_test",
            Arc::new(HashEmbedder::default()),
        )
        .await;
        if store.is_err() {
            return;
        }
        let store = store.unwrap();
        assert!(store.course_count().await.is_ok());
    }
}
