//! Per-resource sync orchestration.
//!
//! `ResourceClient` ties the pieces together for one collection: it
//! decides between the online and offline paths, merges server pages
//! into the cache, captures offline mutations as pending rows, and
//! replays them when the network is back. All cache writes go through
//! a single whole-collection read-modify-write, and every operation
//! takes `&mut self`, so two conflicting mutations can never interleave
//! on the same client.

use std::time::Duration;

use crate::config::ResourceOptions;
use crate::connectivity::Connectivity;
use crate::error::{Error, Result};
use crate::models::{adopt_pending, Op, Record, RecordId, Session};
use crate::normalize::{
    dedupe_by_id_prefer_local, matches_search, normalize_for_view, sort_newest_first,
};
use crate::reconcile::{can_prune_cache, reconcile_with_server, tag_server_row};
use crate::remote::{ListQuery, RemoteStore};
use crate::store::{CacheStore, CollectionSlot};
use crate::sync::{replay_pending, ReplayReport};
use crate::util::now_rfc3339;

/// Page size used when walking the whole remote collection.
const FULL_SYNC_PER_PAGE: usize = 200;
/// Full-sync requests get a little more room than regular fetches.
const FULL_SYNC_TIMEOUT_EXTRA: Duration = Duration::from_secs(1);

/// Server-side sort order requested on fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub by: String,
    pub descending: bool,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            by: "id".to_string(),
            descending: true,
        }
    }
}

/// Client-side pagination over the display projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
    /// Number of rows in the current display projection.
    pub total: usize,
}

/// How a save landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Created on the server.
    Created,
    /// Updated on the server.
    Updated,
    /// Captured locally with a provisional id, pending replay.
    CreatedOffline,
    /// Captured locally as a pending update.
    UpdatedOffline,
}

impl SaveOutcome {
    /// True when the mutation still awaits replay.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::CreatedOffline | Self::UpdatedOffline)
    }
}

/// Result of a save: how it landed and the id the row carries now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    pub outcome: SaveOutcome,
    /// `None` only when the server answered a create without an id.
    pub id: Option<RecordId>,
}

/// How a delete landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Deleted on the server.
    Deleted,
    /// Captured locally as a tombstone (or dropped outright for rows the
    /// server never saw), pending replay.
    DeletedOffline,
}

/// Offline-first client for one synced collection.
pub struct ResourceClient {
    options: ResourceOptions,
    session: Session,
    slot: CollectionSlot,
    store: Box<dyn CacheStore>,
    remote: Box<dyn RemoteStore>,
    connectivity: Box<dyn Connectivity>,
    items: Vec<Record>,
    pagination: Pagination,
    search: String,
    sort: SortSpec,
}

impl ResourceClient {
    /// Build a client for one collection.
    pub fn new(
        options: ResourceOptions,
        session: Session,
        store: Box<dyn CacheStore>,
        remote: Box<dyn RemoteStore>,
        connectivity: Box<dyn Connectivity>,
    ) -> Result<Self> {
        if !options.is_configured() {
            return Err(Error::InvalidInput(
                "resource options must name a resource".to_string(),
            ));
        }
        let slot = CollectionSlot::new(options.cache_key());
        let pagination = Pagination {
            page: 1,
            per_page: options.per_page,
            total: 0,
        };
        Ok(Self {
            options,
            session,
            slot,
            store,
            remote,
            connectivity,
            items: Vec::new(),
            pagination,
            search: String::new(),
            sort: SortSpec::default(),
        })
    }

    /// The collection configuration.
    #[must_use]
    pub fn options(&self) -> &ResourceOptions {
        &self.options
    }

    /// The owner context this client runs under.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The current display projection, newest first.
    #[must_use]
    pub fn items(&self) -> &[Record] {
        &self.items
    }

    /// The current page slice of the display projection.
    #[must_use]
    pub fn paged_items(&self) -> &[Record] {
        let start = self.pagination.page.saturating_sub(1) * self.pagination.per_page;
        if start >= self.items.len() {
            return &[];
        }
        let end = (start + self.pagination.per_page).min(self.items.len());
        &self.items[start..end]
    }

    /// Pagination state.
    #[must_use]
    pub const fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    /// Move to a page (1-based).
    pub fn set_page(&mut self, page: usize) {
        self.pagination.page = page.max(1);
    }

    /// The active search query.
    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Change the search query. Resets to the first page.
    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
        self.pagination.page = 1;
    }

    /// The requested server-side sort.
    #[must_use]
    pub const fn sort(&self) -> &SortSpec {
        &self.sort
    }

    /// Ask the connectivity source whether the server is reachable.
    pub async fn is_online(&self) -> bool {
        self.connectivity.is_online().await
    }

    /// The raw cached collection, unfiltered.
    #[must_use]
    pub fn cached_records(&self) -> Vec<Record> {
        self.load_cache()
    }

    /// Number of cached rows still awaiting replay.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.load_cache()
            .iter()
            .filter(|record| record.is_pending())
            .count()
    }

    fn load_cache(&self) -> Vec<Record> {
        self.slot.load(self.store.as_ref())
    }

    fn save_cache(&mut self, records: &[Record]) -> Result<()> {
        self.slot.save(self.store.as_mut(), records)
    }

    fn sorted(&self, records: &[Record]) -> Vec<Record> {
        sort_newest_first(records, &self.options.date_fields_order)
    }

    fn deduped(&self, records: &[Record]) -> Vec<Record> {
        dedupe_by_id_prefer_local(
            records,
            &self.options.merge_base_fields,
            &self.options.date_fields_order,
        )
    }

    /// Recompute the display projection from a candidate row set:
    /// owner-filter, merge for view, then apply any active search.
    fn rebuild_view(&mut self, records: &[Record]) {
        let visible: Vec<Record> = records
            .iter()
            .filter(|record| self.session.can_view(record))
            .cloned()
            .collect();
        let mut view = normalize_for_view(&visible, &self.options.date_fields_order);
        if !self.search.is_empty() {
            view.retain(|record| matches_search(record, &self.search, &self.options.search_fields));
        }
        self.pagination.total = view.len();
        self.items = view;
    }

    /// Claim pending rows authored under another (or no) account for the
    /// current session, persisting when anything changed.
    fn adopt_pending_rows(&mut self) -> Result<Vec<Record>> {
        let mut cache = self.load_cache();
        if adopt_pending(&mut cache, &self.session) {
            cache = self.sorted(&cache);
            self.save_cache(&cache)?;
        }
        Ok(cache)
    }

    fn tag_server_rows(&self, mut rows: Vec<Record>) -> Vec<Record> {
        for row in &mut rows {
            tag_server_row(row, &self.session, &self.options);
        }
        rows
    }

    fn list_query(&self) -> ListQuery {
        ListQuery {
            email: self.session.email().to_string(),
            page: self.pagination.page,
            per_page: self.pagination.per_page,
            search: self.search.clone(),
            sort_by: self.sort.by.clone(),
            sort_desc: self.sort.descending,
            timeout: None,
        }
    }

    /// The top-level read path.
    ///
    /// Offline, this serves straight from the cache. Online, it pulls the
    /// current page, merges it into the cache (reconciling only when the
    /// page is provably the whole collection), replays pending rows, and
    /// rebuilds the display. Search results are displayed but never
    /// persisted. A network failure mid-fetch falls back to the cache;
    /// a server error is returned to the caller.
    pub async fn fetch_data(&mut self) -> Result<()> {
        if !self.connectivity.is_online().await {
            let cached = self.deduped(&self.load_cache());
            self.rebuild_view(&cached);
            return Ok(());
        }

        let cache = self.adopt_pending_rows()?;

        let page = match self.remote.list(&self.list_query()).await {
            Ok(page) => page,
            Err(error) if error.is_network() => {
                tracing::warn!("Fetch failed, serving from cache: {}", error);
                let cached = self.deduped(&self.load_cache());
                self.rebuild_view(&cached);
                return Ok(());
            }
            Err(error) => return Err(error),
        };

        let server_rows = self.tag_server_rows(page.rows);
        let prune = can_prune_cache(
            self.pagination.page,
            &self.search,
            server_rows.len(),
            page.total,
        );

        let merged = if prune {
            let merged = reconcile_with_server(&cache, &server_rows, &self.session, &self.options);
            self.save_cache(&merged)?;
            merged
        } else {
            let mut combined = cache;
            combined.extend(server_rows.iter().cloned());
            let merged = self.deduped(&combined);
            if self.search.is_empty() {
                let sorted = self.sorted(&merged);
                self.save_cache(&sorted)?;
                sorted
            } else {
                merged
            }
        };

        if self.search.is_empty() {
            self.rebuild_view(&merged);
        } else {
            self.rebuild_view(&server_rows);
        }

        let mut cache = self.load_cache();
        let report = replay_pending(&mut cache, self.remote.as_ref(), &self.session).await;
        if report.attempted > 0 {
            let sorted = self.sorted(&cache);
            self.save_cache(&sorted)?;
        }
        if self.search.is_empty() {
            let refreshed = self.load_cache();
            self.rebuild_view(&refreshed);
        }
        Ok(())
    }

    /// Create or update a record.
    ///
    /// A form with an id is an edit, anything else a create. Offline, or
    /// when the network drops mid-request, the mutation is captured as a
    /// pending cache row instead of being lost. A server rejection is
    /// returned as-is and nothing is captured.
    pub async fn save_data(&mut self, form: &Record) -> Result<SaveReceipt> {
        let id = form.id();
        if !self.connectivity.is_online().await {
            return self.save_offline(form, id.as_ref());
        }

        let attempt = match &id {
            Some(id) => self.save_online_edit(form, id).await,
            None => self.save_online_create(form).await,
        };
        match attempt {
            Ok(receipt) => Ok(receipt),
            Err(error) if error.is_network() => {
                tracing::warn!("Save failed on the network, capturing offline: {}", error);
                self.save_offline(form, id.as_ref())
            }
            Err(error) => Err(error),
        }
    }

    async fn save_online_edit(&mut self, form: &Record, id: &RecordId) -> Result<SaveReceipt> {
        let payload = form.wire_payload(self.session.email());
        let server_item = self.remote.update(id, &payload).await?;

        let key = id.to_string();
        let mut resolved_id = id.clone();
        let mut cache = self.load_cache();
        let position = cache
            .iter()
            .position(|row| row.id().is_some_and(|rid| rid.to_string() == key));
        if let Some(index) = position {
            let row = &mut cache[index];
            match &server_item {
                Some(item) => row.merge_from(item),
                None => row.merge_from(&payload),
            }
            let new_id = server_item
                .as_ref()
                .and_then(Record::id)
                .unwrap_or_else(|| id.clone());
            row.set_id(&new_id);
            row.set_email(self.session.email());
            row.set_synced(true);
            if row.local_id().is_none() {
                if let Some(local_id) = form.local_id() {
                    row.set_local_id(local_id);
                } else {
                    row.ensure_local_id();
                }
            }
            let updated_at = server_item
                .as_ref()
                .and_then(|item| item.updated_at().map(str::to_string))
                .unwrap_or_else(now_rfc3339);
            row.set_updated_at(updated_at);
            resolved_id = new_id;

            let sorted = self.sorted(&cache);
            self.save_cache(&sorted)?;
            self.rebuild_view(&sorted);
        }
        Ok(SaveReceipt {
            outcome: SaveOutcome::Updated,
            id: Some(resolved_id),
        })
    }

    async fn save_online_create(&mut self, form: &Record) -> Result<SaveReceipt> {
        let payload = form.wire_payload(self.session.email());
        let created = self.remote.create(&payload).await?;
        let created_id = created.id();

        let mut cache = self.load_cache();
        if let Some(id) = &created_id {
            let key = id.to_string();
            cache.retain(|row| row.id().is_none_or(|rid| rid.to_string() != key));
        }
        let mut row = created;
        row.set_email(self.session.email());
        row.set_synced(true);
        if row.created_at().is_none() {
            row.set_created_at(now_rfc3339());
        }
        cache.insert(0, row);

        let sorted = self.sorted(&cache);
        self.save_cache(&sorted)?;
        self.rebuild_view(&sorted);
        self.pagination.page = 1;
        Ok(SaveReceipt {
            outcome: SaveOutcome::Created,
            id: created_id,
        })
    }

    fn save_offline(&mut self, form: &Record, id: Option<&RecordId>) -> Result<SaveReceipt> {
        let payload = form.wire_payload(self.session.email());
        let mut cache = self.load_cache();

        let receipt = if let Some(id) = id {
            let key = id.to_string();
            let Some(row) = cache
                .iter_mut()
                .find(|row| row.id().is_some_and(|rid| rid.to_string() == key))
            else {
                return Err(Error::InvalidInput(format!(
                    "no cached row with id {key} to update"
                )));
            };
            row.merge_from(&payload);
            row.set_id(id);
            row.set_email(self.session.email());
            if row.created_at().is_none() {
                row.set_created_at(now_rfc3339());
            }
            row.set_synced(false);
            row.set_op(Op::Update);
            SaveReceipt {
                outcome: SaveOutcome::UpdatedOffline,
                id: Some(id.clone()),
            }
        } else {
            let local = RecordId::local_now();
            let mut row = payload;
            row.set_id(&local);
            row.set_created_at(now_rfc3339());
            row.set_synced(false);
            row.set_op(Op::Create);
            if let Some(local_id) = form.local_id() {
                row.set_local_id(local_id);
            }
            row.ensure_local_id();
            cache.insert(0, row);
            SaveReceipt {
                outcome: SaveOutcome::CreatedOffline,
                id: Some(local),
            }
        };

        let merged = self.deduped(&cache);
        let sorted = self.sorted(&merged);
        self.save_cache(&sorted)?;
        self.rebuild_view(&sorted);
        Ok(receipt)
    }

    /// Delete a record.
    ///
    /// Online, the server delete runs first and the cache row is removed
    /// on success. Offline (or on a network failure), rows the server
    /// never saw are dropped outright; anything else is tagged as a
    /// pending delete, tombstoning the id when the cache has no row for
    /// it.
    pub async fn delete_data(&mut self, id: &RecordId) -> Result<DeleteOutcome> {
        if !self.connectivity.is_online().await {
            return self.delete_offline(id);
        }
        match self.remote.delete(id).await {
            Ok(()) => {
                let key = id.to_string();
                let cache: Vec<Record> = self
                    .load_cache()
                    .into_iter()
                    .filter(|row| row.id().is_none_or(|rid| rid.to_string() != key))
                    .collect();
                self.save_cache(&cache)?;
                self.rebuild_view(&cache);
                Ok(DeleteOutcome::Deleted)
            }
            Err(error) if error.is_network() => {
                tracing::warn!("Delete failed on the network, capturing offline: {}", error);
                self.delete_offline(id)
            }
            Err(error) => Err(error),
        }
    }

    fn delete_offline(&mut self, id: &RecordId) -> Result<DeleteOutcome> {
        let mut cache = self.load_cache();
        let key = id.to_string();
        let position = cache
            .iter()
            .position(|row| row.id().is_some_and(|rid| rid.to_string() == key));
        match position {
            Some(index) if cache[index].is_local_only() => {
                cache.remove(index);
            }
            Some(index) => {
                cache[index].set_op(Op::Delete);
                cache[index].set_synced(false);
            }
            None => {
                cache.push(Record::tombstone(id, self.session.email(), now_rfc3339()));
            }
        }
        self.save_cache(&cache)?;
        self.rebuild_view(&cache);
        Ok(DeleteOutcome::DeletedOffline)
    }

    /// Replay pending rows against the server.
    ///
    /// Pending rows are adopted to the current session first, then pushed
    /// one by one; rows that fail stay pending for the next pass.
    pub async fn replay(&mut self) -> Result<ReplayReport> {
        if !self.connectivity.is_online().await {
            return Err(Error::network("offline, pending rows were not replayed"));
        }
        let mut cache = self.adopt_pending_rows()?;
        let report = replay_pending(&mut cache, self.remote.as_ref(), &self.session).await;
        if report.attempted > 0 {
            let sorted = self.sorted(&cache);
            self.save_cache(&sorted)?;
            self.rebuild_view(&sorted);
        }
        Ok(report)
    }

    /// Walk the entire remote collection and reconcile the cache with it.
    ///
    /// Pages of `FULL_SYNC_PER_PAGE` are accumulated until the advertised
    /// total is reached, or a short (or empty) page signals the end. The
    /// accumulated set is complete by construction, so reconciliation is
    /// safe here. Does nothing while offline.
    pub async fn full_sync_all_pages(&mut self) -> Result<()> {
        if !self.connectivity.is_online().await {
            return Ok(());
        }
        let timeout = self.options.timeout() + FULL_SYNC_TIMEOUT_EXTRA;
        let mut all: Vec<Record> = Vec::new();
        let mut page = 1;
        loop {
            let query = ListQuery {
                email: self.session.email().to_string(),
                page,
                per_page: FULL_SYNC_PER_PAGE,
                search: String::new(),
                sort_by: self.sort.by.clone(),
                sort_desc: self.sort.descending,
                timeout: Some(timeout),
            };
            let result = self.remote.list(&query).await?;
            let fetched = result.rows.len();
            all.extend(self.tag_server_rows(result.rows));

            match result.total {
                Some(total) => {
                    let have = u64::try_from(all.len()).unwrap_or(u64::MAX);
                    // an empty page can never reach the total; bail out
                    // instead of paging forever
                    if have >= total || fetched == 0 {
                        break;
                    }
                }
                None => {
                    if fetched < FULL_SYNC_PER_PAGE {
                        break;
                    }
                }
            }
            page += 1;
        }

        let cache = self.load_cache();
        let merged = reconcile_with_server(&cache, &all, &self.session, &self.options);
        self.save_cache(&merged)?;
        self.rebuild_view(&merged);
        Ok(())
    }

    /// Connectivity-restored sequence: replay pending mutations, then
    /// reconcile against the full collection, then refetch the current
    /// page. Replay runs first so locally authored changes reach the
    /// server before reconciliation could prune them.
    pub async fn on_online(&mut self) -> Result<ReplayReport> {
        let report = self.replay().await?;
        self.full_sync_all_pages().await?;
        self.fetch_data().await?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::Fixed;
    use crate::remote::Page;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
    use std::sync::{Arc, Mutex};

    /// Remote double with scripted responses and a call log.
    #[derive(Clone)]
    struct ScriptedRemote {
        inner: Arc<Inner>,
    }

    struct Inner {
        log: Mutex<Vec<String>>,
        queries: Mutex<Vec<ListQuery>>,
        list_results: Mutex<VecDeque<Result<Page>>>,
        create_results: Mutex<VecDeque<Result<Record>>>,
        update_results: Mutex<VecDeque<Result<Option<Record>>>>,
        delete_results: Mutex<VecDeque<Result<()>>>,
        next_id: AtomicI64,
    }

    impl ScriptedRemote {
        fn new() -> Self {
            Self {
                inner: Arc::new(Inner {
                    log: Mutex::new(Vec::new()),
                    queries: Mutex::new(Vec::new()),
                    list_results: Mutex::new(VecDeque::new()),
                    create_results: Mutex::new(VecDeque::new()),
                    update_results: Mutex::new(VecDeque::new()),
                    delete_results: Mutex::new(VecDeque::new()),
                    next_id: AtomicI64::new(501),
                }),
            }
        }

        fn script_list(&self, result: Result<Page>) {
            self.inner.list_results.lock().unwrap().push_back(result);
        }

        fn script_create(&self, result: Result<Record>) {
            self.inner.create_results.lock().unwrap().push_back(result);
        }

        fn script_update(&self, result: Result<Option<Record>>) {
            self.inner.update_results.lock().unwrap().push_back(result);
        }

        fn script_delete(&self, result: Result<()>) {
            self.inner.delete_results.lock().unwrap().push_back(result);
        }

        fn log(&self) -> Vec<String> {
            self.inner.log.lock().unwrap().clone()
        }

        fn queries(&self) -> Vec<ListQuery> {
            self.inner.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteStore for ScriptedRemote {
        async fn list(&self, query: &ListQuery) -> Result<Page> {
            self.inner
                .log
                .lock()
                .unwrap()
                .push(format!("LIST page {}", query.page));
            self.inner.queries.lock().unwrap().push(query.clone());
            self.inner
                .list_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Page::default()))
        }

        async fn create(&self, payload: &Record) -> Result<Record> {
            self.inner.log.lock().unwrap().push("POST".to_string());
            self.inner
                .create_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    let mut created = payload.clone();
                    created.set_id(&RecordId::Int(
                        self.inner.next_id.fetch_add(1, Ordering::SeqCst),
                    ));
                    Ok(created)
                })
        }

        async fn update(&self, id: &RecordId, _payload: &Record) -> Result<Option<Record>> {
            self.inner.log.lock().unwrap().push(format!("PUT {id}"));
            self.inner
                .update_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(None))
        }

        async fn delete(&self, id: &RecordId) -> Result<()> {
            self.inner.log.lock().unwrap().push(format!("DELETE {id}"));
            self.inner
                .delete_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()))
        }
    }

    /// Connectivity that can be flipped mid-test.
    #[derive(Clone)]
    struct Switch(Arc<AtomicBool>);

    impl Switch {
        fn new(online: bool) -> Self {
            Self(Arc::new(AtomicBool::new(online)))
        }

        fn set_online(&self, online: bool) {
            self.0.store(online, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Connectivity for Switch {
        async fn is_online(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn rec(value: serde_json::Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    fn seeded_store(seed: &[Record]) -> MemoryStore {
        let mut store = MemoryStore::new();
        if !seed.is_empty() {
            CollectionSlot::new("pembelian_data")
                .save(&mut store, seed)
                .unwrap();
        }
        store
    }

    fn client(
        remote: &ScriptedRemote,
        connectivity: impl Connectivity + 'static,
        seed: &[Record],
    ) -> ResourceClient {
        ResourceClient::new(
            ResourceOptions::new("pembelian"),
            Session::new("a@b.c"),
            Box::new(seeded_store(seed)),
            Box::new(remote.clone()),
            Box::new(connectivity),
        )
        .unwrap()
    }

    fn keys(records: &[Record]) -> Vec<String> {
        records
            .iter()
            .map(|record| record.merge_key().unwrap_or_default())
            .collect()
    }

    #[test]
    fn new_rejects_blank_resources() {
        let remote = ScriptedRemote::new();
        let built = ResourceClient::new(
            ResourceOptions::new("  "),
            Session::new("a@b.c"),
            Box::new(MemoryStore::new()),
            Box::new(remote),
            Box::new(Fixed(true)),
        );
        assert!(built.is_err());
    }

    #[tokio::test]
    async fn offline_fetch_serves_the_cache() {
        let remote = ScriptedRemote::new();
        let seed = vec![
            rec(json!({"id": 1, "email": "a@b.c", "synced": true,
                "created_at": "2024-01-01T00:00:00Z"})),
            rec(json!({"id": 2, "email": "other@b.c", "synced": true,
                "created_at": "2024-01-02T00:00:00Z"})),
            rec(json!({"id": 3, "email": "other@b.c", "synced": false, "__op": "update",
                "created_at": "2024-01-03T00:00:00Z"})),
            rec(json!({"id": 4, "synced": false, "__op": "delete"})),
        ];
        let mut client = client(&remote, Fixed(false), &seed);

        client.fetch_data().await.unwrap();

        // foreign synced row hidden, foreign pending visible, tombstone gone
        assert_eq!(keys(client.items()), vec!["3", "1"]);
        assert_eq!(client.pagination().total, 2);
        assert!(remote.log().is_empty());
    }

    #[tokio::test]
    async fn offline_fetch_applies_the_search_filter() {
        let remote = ScriptedRemote::new();
        let seed = vec![
            rec(json!({"id": 1, "email": "a@b.c", "synced": true, "keterangan": "beli kopi"})),
            rec(json!({"id": 2, "email": "a@b.c", "synced": true, "keterangan": "jual gula"})),
        ];
        let mut client = client(&remote, Fixed(false), &seed);
        client.set_search("kopi");

        client.fetch_data().await.unwrap();
        assert_eq!(keys(client.items()), vec!["1"]);
    }

    #[tokio::test]
    async fn partial_pages_merge_additively() {
        let remote = ScriptedRemote::new();
        remote.script_list(Ok(Page {
            rows: vec![rec(json!({"id": 1, "created_at": "2024-03-01T00:00:00Z"}))],
            total: Some(40),
        }));
        let seed = vec![rec(json!({"id": 5, "email": "a@b.c", "synced": true,
            "created_at": "2024-01-01T00:00:00Z"}))];
        let mut client = client(&remote, Fixed(true), &seed);

        client.fetch_data().await.unwrap();

        // 1 of 40 rows returned: nothing may be pruned
        let cached = client.cached_records();
        assert_eq!(keys(&cached), vec!["1", "5"]);
        assert_eq!(keys(client.items()), vec!["1", "5"]);
        assert!(cached[0].is_from_server());
        assert!(cached[0].is_synced());
    }

    #[tokio::test]
    async fn complete_first_pages_prune_stale_rows() {
        let remote = ScriptedRemote::new();
        remote.script_list(Ok(Page {
            rows: vec![
                rec(json!({"id": 1, "created_at": "2024-03-01T00:00:00Z"})),
                rec(json!({"id": 2, "created_at": "2024-03-02T00:00:00Z"})),
            ],
            total: Some(2),
        }));
        let seed = vec![
            // synced, owned, absent from the server: pruned
            rec(json!({"id": 5, "email": "a@b.c", "synced": true})),
            // pending: kept
            rec(json!({"id": "local_1", "local_id": "u-1", "synced": false, "__op": "create"})),
            // foreign: kept untouched
            rec(json!({"id": 9, "email": "other@b.c", "synced": true})),
        ];
        let mut client = client(&remote, Fixed(true), &seed);

        client.fetch_data().await.unwrap();

        let cached = client.cached_records();
        let cached_keys = keys(&cached);
        assert!(!cached_keys.contains(&"5".to_string()));
        assert!(cached_keys.contains(&"9".to_string()));
        assert!(cached_keys.contains(&"1".to_string()));
        assert!(cached_keys.contains(&"2".to_string()));
        // the pending create was replayed right after the merge
        assert!(cached_keys.iter().any(|key| key == "501"));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn search_results_are_displayed_but_never_persisted() {
        let remote = ScriptedRemote::new();
        remote.script_list(Ok(Page {
            rows: vec![
                rec(json!({"id": 7, "no_faktur": "FK-77"})),
                rec(json!({"id": 8, "no_faktur": "HN-88"})),
            ],
            total: Some(2),
        }));
        let seed = vec![rec(json!({"id": 5, "email": "a@b.c", "synced": true}))];
        let mut client = client(&remote, Fixed(true), &seed);
        client.set_search("fk-77");

        client.fetch_data().await.unwrap();

        // the matcher narrows the page further, and the cache is untouched
        assert_eq!(keys(client.items()), vec!["7"]);
        assert_eq!(keys(&client.cached_records()), vec!["5"]);
        let query = &remote.queries()[0];
        assert_eq!(query.search, "fk-77");
        assert_eq!(query.email, "a@b.c");
    }

    #[tokio::test]
    async fn fetch_falls_back_to_the_cache_on_network_errors() {
        let remote = ScriptedRemote::new();
        remote.script_list(Err(Error::network("connection refused")));
        let seed = vec![rec(json!({"id": 5, "email": "a@b.c", "synced": true}))];
        let mut client = client(&remote, Fixed(true), &seed);

        client.fetch_data().await.unwrap();
        assert_eq!(keys(client.items()), vec!["5"]);
    }

    #[tokio::test]
    async fn fetch_surfaces_server_errors() {
        let remote = ScriptedRemote::new();
        remote.script_list(Err(Error::server(500, "boom")));
        let mut client = client(&remote, Fixed(true), &[]);

        let err = client.fetch_data().await.unwrap_err();
        assert_eq!(err.status_code(), Some(500));
    }

    #[tokio::test]
    async fn save_online_create_prepends_and_resets_the_page() {
        let remote = ScriptedRemote::new();
        remote.script_create(Ok(rec(json!({
            "id": 9, "nama": "Kopi", "created_at": "2024-04-01T00:00:00Z"
        }))));
        // a stale copy of the same id sits in the cache
        let seed = vec![rec(json!({"id": 9, "email": "a@b.c", "synced": true, "nama": "old"}))];
        let mut client = client(&remote, Fixed(true), &seed);
        client.set_page(3);

        let mut form = Record::new();
        form.set("nama", json!("Kopi"));
        let receipt = client.save_data(&form).await.unwrap();

        assert_eq!(receipt.outcome, SaveOutcome::Created);
        assert!(!receipt.outcome.is_pending());
        assert_eq!(receipt.id, Some(RecordId::Int(9)));
        let cached = client.cached_records();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].get("nama"), Some(&json!("Kopi")));
        assert!(cached[0].is_synced());
        assert_eq!(cached[0].email(), Some("a@b.c"));
        assert_eq!(client.pagination().page, 1);
    }

    #[tokio::test]
    async fn save_online_edit_merges_the_server_copy() {
        let remote = ScriptedRemote::new();
        remote.script_update(Ok(Some(rec(json!({
            "id": 7, "total": 999, "updated_at": "2024-04-02T00:00:00Z"
        })))));
        let seed = vec![rec(json!({"id": 7, "email": "a@b.c", "synced": true, "total": 100}))];
        let mut client = client(&remote, Fixed(true), &seed);

        let mut form = Record::new();
        form.set("id", json!(7));
        form.set("total", json!(500));
        let receipt = client.save_data(&form).await.unwrap();

        assert_eq!(receipt.outcome, SaveOutcome::Updated);
        assert_eq!(receipt.id, Some(RecordId::Int(7)));
        let cached = client.cached_records();
        assert_eq!(cached.len(), 1);
        // server copy wins over the submitted value
        assert_eq!(cached[0].get("total"), Some(&json!(999)));
        assert_eq!(cached[0].updated_at(), Some("2024-04-02T00:00:00Z"));
        assert!(cached[0].is_synced());
        assert!(cached[0].local_id().is_some());
        assert_eq!(remote.log(), vec!["PUT 7".to_string()]);
    }

    #[tokio::test]
    async fn save_captures_offline_when_the_network_drops() {
        let remote = ScriptedRemote::new();
        remote.script_create(Err(Error::network("connection reset")));
        let mut client = client(&remote, Fixed(true), &[]);

        let mut form = Record::new();
        form.set("nama", json!("Gula"));
        let receipt = client.save_data(&form).await.unwrap();

        assert_eq!(receipt.outcome, SaveOutcome::CreatedOffline);
        assert!(receipt.id.is_some_and(|id| id.is_local()));
        let cached = client.cached_records();
        assert_eq!(cached.len(), 1);
        let row = &cached[0];
        assert!(row.is_local_only());
        assert!(row.is_pending());
        assert_eq!(row.op(), Some(Op::Create));
        assert!(row.local_id().is_some());
        assert_eq!(row.email(), Some("a@b.c"));
        // visible immediately
        assert_eq!(client.items().len(), 1);
    }

    #[tokio::test]
    async fn save_does_not_capture_server_rejections() {
        let remote = ScriptedRemote::new();
        remote.script_create(Err(Error::server(422, "nama is required")));
        let mut client = client(&remote, Fixed(true), &[]);

        let err = client.save_data(&Record::new()).await.unwrap_err();
        assert_eq!(err.status_code(), Some(422));
        assert!(client.cached_records().is_empty());
    }

    #[tokio::test]
    async fn offline_edit_of_an_unknown_row_is_an_error() {
        let remote = ScriptedRemote::new();
        let mut client = client(&remote, Fixed(false), &[]);

        let mut form = Record::new();
        form.set("id", json!(7));
        let err = client.save_data(&form).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn offline_create_then_replay_adopts_the_server_identity() {
        let remote = ScriptedRemote::new();
        remote.script_create(Ok(rec(json!({
            "id": 42, "nama": "Teh", "created_at": "2024-04-01T00:00:00Z"
        }))));
        let connectivity = Switch::new(false);
        let mut client = client(&remote, connectivity.clone(), &[]);

        let mut form = Record::new();
        form.set("nama", json!("Teh"));
        let receipt = client.save_data(&form).await.unwrap();
        assert_eq!(receipt.outcome, SaveOutcome::CreatedOffline);
        let local_id = client.cached_records()[0].local_id().map(str::to_string);
        assert!(local_id.is_some());

        connectivity.set_online(true);
        let report = client.replay().await.unwrap();
        assert_eq!(report.succeeded, 1);

        let cached = client.cached_records();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].id(), Some(RecordId::Int(42)));
        assert!(cached[0].is_synced());
        assert_eq!(cached[0].op(), None);
        // correlation id survives the identity swap
        assert_eq!(cached[0].local_id().map(str::to_string), local_id);
        assert!(!keys(&cached).iter().any(|key| key.starts_with("local_")));
    }

    #[tokio::test]
    async fn replay_while_offline_is_refused() {
        let remote = ScriptedRemote::new();
        let mut client = client(&remote, Fixed(false), &[]);
        let err = client.replay().await.unwrap_err();
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn delete_online_removes_the_row() {
        let remote = ScriptedRemote::new();
        let seed = vec![rec(json!({"id": 7, "email": "a@b.c", "synced": true}))];
        let mut client = client(&remote, Fixed(true), &seed);

        let outcome = client.delete_data(&RecordId::Int(7)).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert!(client.cached_records().is_empty());
        assert_eq!(remote.log(), vec!["DELETE 7".to_string()]);
    }

    #[tokio::test]
    async fn delete_offline_tags_drops_or_tombstones() {
        let remote = ScriptedRemote::new();
        let seed = vec![
            rec(json!({"id": 7, "email": "a@b.c", "synced": true})),
            rec(json!({"id": "local_9", "synced": false, "__op": "create"})),
        ];
        let mut client = client(&remote, Fixed(false), &seed);

        // server-known row: tagged as a pending delete, hidden from view
        client.delete_data(&RecordId::Int(7)).await.unwrap();
        let cached = client.cached_records();
        let seven = cached
            .iter()
            .find(|row| row.id() == Some(RecordId::Int(7)))
            .unwrap();
        assert_eq!(seven.op(), Some(Op::Delete));
        assert!(seven.is_pending());
        assert!(!keys(client.items()).contains(&"7".to_string()));

        // local-only row: dropped outright
        client
            .delete_data(&RecordId::Text("local_9".to_string()))
            .await
            .unwrap();
        assert!(!keys(&client.cached_records()).contains(&"local_9".to_string()));

        // unknown id: tombstoned so the delete still replays
        client.delete_data(&RecordId::Int(55)).await.unwrap();
        let cached = client.cached_records();
        let tomb = cached
            .iter()
            .find(|row| row.id() == Some(RecordId::Int(55)))
            .unwrap();
        assert_eq!(tomb.op(), Some(Op::Delete));
        assert_eq!(tomb.email(), Some("a@b.c"));
        assert!(remote.log().is_empty());
    }

    #[tokio::test]
    async fn full_sync_accumulates_pages_until_the_total() {
        let remote = ScriptedRemote::new();
        remote.script_list(Ok(Page {
            rows: vec![rec(json!({"id": 1})), rec(json!({"id": 2}))],
            total: Some(3),
        }));
        remote.script_list(Ok(Page {
            rows: vec![rec(json!({"id": 3}))],
            total: Some(3),
        }));
        let seed = vec![rec(json!({"id": 9, "email": "a@b.c", "synced": true}))];
        let mut client = client(&remote, Fixed(true), &seed);

        client.full_sync_all_pages().await.unwrap();

        let queries = remote.queries();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].per_page, FULL_SYNC_PER_PAGE);
        assert_eq!(queries[0].timeout, Some(Duration::from_secs(8)));
        assert_eq!(queries[1].page, 2);

        // id 9 was absent from the complete snapshot: pruned
        let cached_keys = keys(&client.cached_records());
        assert!(!cached_keys.contains(&"9".to_string()));
        assert_eq!(cached_keys.len(), 3);
    }

    #[tokio::test]
    async fn full_sync_stops_on_a_short_page_without_a_total() {
        let remote = ScriptedRemote::new();
        remote.script_list(Ok(Page {
            rows: vec![rec(json!({"id": 1}))],
            total: None,
        }));
        let mut client = client(&remote, Fixed(true), &[]);

        client.full_sync_all_pages().await.unwrap();
        assert_eq!(remote.queries().len(), 1);
    }

    #[tokio::test]
    async fn on_online_replays_before_reconciling() {
        let remote = ScriptedRemote::new();
        remote.script_update(Ok(None));
        // full sync snapshot, then the regular fetch page
        remote.script_list(Ok(Page {
            rows: vec![rec(json!({"id": 7, "total": 250}))],
            total: Some(1),
        }));
        remote.script_list(Ok(Page {
            rows: vec![rec(json!({"id": 7, "total": 250}))],
            total: Some(1),
        }));
        let seed = vec![rec(json!({
            "id": 7, "email": "a@b.c", "synced": false, "__op": "update", "total": 250
        }))];
        let mut client = client(&remote, Fixed(true), &seed);

        let report = client.on_online().await.unwrap();
        assert_eq!(report.succeeded, 1);

        let log = remote.log();
        assert_eq!(log[0], "PUT 7");
        assert!(log[1].starts_with("LIST"));
        assert_eq!(client.pending_count(), 0);
        assert_eq!(keys(client.items()), vec!["7"]);
    }

    #[tokio::test]
    async fn paged_items_slices_the_projection() {
        let remote = ScriptedRemote::new();
        let seed: Vec<Record> = (1..=5)
            .map(|id| rec(json!({"id": id, "email": "a@b.c", "synced": true})))
            .collect();
        let mut client = client(&remote, Fixed(false), &seed);
        client.fetch_data().await.unwrap();

        client.set_page(1);
        assert_eq!(client.paged_items().len(), 5);

        let mut client = ResourceClient::new(
            ResourceOptions::new("pembelian").with_per_page(2),
            Session::new("a@b.c"),
            Box::new(seeded_store(&seed)),
            Box::new(remote.clone()),
            Box::new(Fixed(false)),
        )
        .unwrap();
        client.fetch_data().await.unwrap();

        assert_eq!(keys(client.paged_items()), vec!["5", "4"]);
        client.set_page(3);
        assert_eq!(keys(client.paged_items()), vec!["1"]);
        client.set_page(9);
        assert!(client.paged_items().is_empty());
    }

    #[test]
    fn set_search_resets_the_page() {
        let remote = ScriptedRemote::new();
        let mut client = client(&remote, Fixed(true), &[]);
        client.set_page(4);
        client.set_search("kopi");
        assert_eq!(client.pagination().page, 1);
        assert_eq!(client.search(), "kopi");
    }
}
