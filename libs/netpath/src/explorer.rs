//! Drill down from targets to traces to hops.
//!
//! Query failures never reach the caller: they are logged and the view gets
//! an empty result. Responses that arrive after the selection moved on are
//! dropped and reported as `None`.

use nrql::templates::{self, TrendMetric};
use nrql::{FilterExpr, FilterSelection, Query, TimeWindow, compile};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::ValueCache;
use crate::client::QueryService;
use crate::error::Error;
use crate::hop::HopRecord;
use crate::layout::HopMap;
use crate::rows::{
    Account, FilterKey, Row, SourceHosts, TargetMetadata, TargetSummary, TraceSummary,
    TrendPoint, Uniques, parse_rows,
};
use crate::sequence::Slot;

/// What every view depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub account: Option<i64>,
    pub window: TimeWindow,
    pub filter: FilterExpr,
}

/// The selection a request was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub account: Option<i64>,
    pub window: TimeWindow,
    /// Set only for views whose query is narrowed by the user filter.
    pub filter: Option<FilterExpr>,
    pub target: Option<String>,
    pub trace_id: Option<String>,
    pub metric: Option<TrendMetric>,
}

impl Selection {
    /// Whether `context` would still issue the same query.
    pub fn matches(&self, context: &Context) -> bool {
        self.account == context.account
            && self.window == context.window
            && self
                .filter
                .as_ref()
                .is_none_or(|filter| *filter == context.filter)
    }
}

#[derive(Default)]
struct Views {
    summary: Slot<Selection, Vec<TargetSummary>>,
    hosts: Slot<Selection, Vec<String>>,
    metadata: Slot<Selection, Option<TargetMetadata>>,
    traces: Slot<Selection, Vec<TraceSummary>>,
    hops: Slot<Selection, HopMap>,
    trend: Slot<Selection, Vec<TrendPoint>>,
}

struct State {
    context: Context,
    filters: Vec<FilterSelection>,
    views: Views,
}

pub struct Explorer<S> {
    service: S,
    state: Mutex<State>,
    values: ValueCache,
}

/// Accounts whose name contains `search`, ignoring case.
pub fn search_accounts<'a>(accounts: &'a [Account], search: &str) -> Vec<&'a Account> {
    let search = search.to_lowercase();
    accounts
        .iter()
        .filter(|a| a.name.to_lowercase().contains(&search))
        .collect()
}

impl<S: QueryService + Sync> Explorer<S> {
    pub fn new(service: S, window: TimeWindow, cache_capacity: Option<usize>) -> Self {
        Self {
            service,
            state: Mutex::new(State {
                context: Context {
                    account: None,
                    window,
                    filter: FilterExpr::default(),
                },
                filters: Vec::new(),
                views: Views::default(),
            }),
            values: ValueCache::new(cache_capacity),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn context(&self) -> Context {
        self.state.lock().context.clone()
    }

    pub fn filters(&self) -> Vec<FilterSelection> {
        self.state.lock().filters.clone()
    }

    /// Switching accounts drops the cached filter values.
    pub fn set_account(&self, account: i64) {
        let mut state = self.state.lock();
        if state.context.account != Some(account) {
            state.context.account = Some(account);
            self.values.clear();
        }
    }

    pub fn set_window(&self, window: TimeWindow) {
        self.state.lock().context.window = window;
    }

    pub fn set_filters(&self, filters: Vec<FilterSelection>) {
        let mut state = self.state.lock();
        state.context.filter = compile(&filters);
        state.filters = filters;
    }

    pub fn is_loading(&self) -> bool {
        let state = self.state.lock();
        let views = &state.views;
        views.summary.is_loading()
            || views.hosts.is_loading()
            || views.metadata.is_loading()
            || views.traces.is_loading()
            || views.hops.is_loading()
            || views.trend.is_loading()
    }

    pub async fn accounts(&self) -> Vec<Account> {
        match self.service.accounts().await {
            Ok(accounts) => accounts,
            Err(err) => {
                warn!(?err, "failed to fetch accounts");
                Vec::new()
            }
        }
    }

    fn selection(
        &self,
        filtered: bool,
        target: Option<&str>,
        trace_id: Option<&str>,
    ) -> Selection {
        let context = self.context();
        Selection {
            account: context.account,
            window: context.window,
            filter: filtered.then_some(context.filter),
            target: target.map(str::to_string),
            trace_id: trace_id.map(str::to_string),
            metric: None,
        }
    }

    async fn rows(&self, account: i64, query: &Query) -> Vec<Row> {
        match self.service.query(account, query).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(?err, %query, "query failed");
                Vec::new()
            }
        }
    }

    /// Runs `query` for `selection` and stores the result in the view picked
    /// by `view`, unless a newer request or selection superseded it.
    async fn fetch<T: Clone>(
        &self,
        view: fn(&mut Views) -> &mut Slot<Selection, T>,
        selection: Selection,
        query: Query,
        parse: impl FnOnce(Vec<Row>) -> T,
    ) -> Option<T> {
        let ticket = view(&mut self.state.lock().views).begin(selection.clone());
        let rows = match selection.account {
            Some(account) => self.rows(account, &query).await,
            None => {
                debug!("no account selected");
                Vec::new()
            }
        };
        let data = parse(rows);

        let mut state = self.state.lock();
        let current = selection.matches(&state.context);
        let slot = view(&mut state.views);
        if !current {
            slot.abandon(&ticket);
            debug!(seq = ticket.seq(), "discarding response for an old selection");
            return None;
        }
        if !slot.resolve(&ticket, data.clone()) {
            debug!(seq = ticket.seq(), "discarding superseded response");
            return None;
        }
        Some(data)
    }

    pub async fn summary(&self) -> Option<Vec<TargetSummary>> {
        let selection = self.selection(false, None, None);
        let query = templates::network_path_summary(selection.window);
        self.fetch(|v| &mut v.summary, selection, query, parse_rows).await
    }

    pub async fn source_hosts(&self, target: &str) -> Option<Vec<String>> {
        let selection = self.selection(false, Some(target), None);
        let query = templates::source_hosts(selection.window, target);
        self.fetch(|v| &mut v.hosts, selection, query, |rows| {
            parse_rows::<SourceHosts>(rows)
                .into_iter()
                .next()
                .map(|h| h.hosts)
                .unwrap_or_default()
        })
        .await
    }

    pub async fn target_metadata(&self, target: &str) -> Option<Option<TargetMetadata>> {
        let selection = self.selection(false, Some(target), None);
        let query = templates::target_metadata(selection.window, target);
        self.fetch(|v| &mut v.metadata, selection, query, |rows| {
            parse_rows::<TargetMetadata>(rows).into_iter().next()
        })
        .await
    }

    pub async fn traces(&self, target: &str) -> Option<Vec<TraceSummary>> {
        let selection = self.selection(true, Some(target), None);
        let filter = selection.filter.clone().unwrap_or_default();
        let query = templates::traces_for_target(selection.window, target, &filter);
        self.fetch(|v| &mut v.traces, selection, query, parse_rows).await
    }

    pub async fn hops(&self, target: &str, trace_id: &str) -> Option<HopMap> {
        let selection = self.selection(false, Some(target), Some(trace_id));
        let query = templates::hop_details(selection.window, target, trace_id);
        self.fetch(|v| &mut v.hops, selection, query, |rows| {
            HopMap::new(parse_rows::<HopRecord>(rows))
        })
        .await
    }

    pub async fn trend(&self, target: &str, metric: TrendMetric) -> Option<Vec<TrendPoint>> {
        let mut selection = self.selection(true, Some(target), None);
        selection.metric = Some(metric);
        let filter = selection.filter.clone().unwrap_or_default();
        let query = templates::trace_trend(selection.window, target, &filter, metric);
        self.fetch(|v| &mut v.trend, selection, query, |rows| {
            rows.iter()
                .filter_map(|row| TrendPoint::from_row(row, metric))
                .collect()
        })
        .await
    }

    /// Attributes that can be filtered on, minus the excluded ones.
    pub async fn filter_keys(&self) -> Vec<FilterKey> {
        let Some(account) = self.context().account else {
            return Vec::new();
        };
        let rows = self.rows(account, &templates::filter_keys()).await;
        parse_rows::<FilterKey>(rows)
            .into_iter()
            .filter(|k| templates::is_filterable_key(&k.key))
            .collect()
    }

    /// Values seen for `key`, cached per attribute. Values fetched for an
    /// account that was switched away from mid flight are dropped.
    pub async fn filter_values(&self, key: &str) -> Vec<String> {
        if self.context().account.is_none() {
            return Vec::new();
        }
        let query = templates::filter_values(key);
        let fetched = self
            .values
            .get_or_fetch(key, || async {
                let account = self.context().account.ok_or(Error::MissingAccount)?;
                let rows = self.service.query(account, &query).await?;
                Ok::<_, Error>(
                    parse_rows::<Uniques>(rows)
                        .into_iter()
                        .next()
                        .map(|u| u.values)
                        .unwrap_or_default(),
                )
            })
            .await;
        match fetched {
            Ok(Some(values)) => values,
            Ok(None) => {
                debug!(key, "discarding filter values for an old account");
                Vec::new()
            }
            Err(err) => {
                warn!(?err, key, "failed to fetch filter values");
                Vec::new()
            }
        }
    }

    pub fn cached_filter_keys(&self) -> usize {
        self.values.len()
    }
}
