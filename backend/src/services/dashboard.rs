//! Dashboard service
//! Local inventory statistics plus widgets fed by the online store

use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use crate::config::{Config, InventoryConfig};
use crate::error::{AppError, AppResult};
use crate::external::{OnlineProduct, WooCommerceClient};
use crate::services::product::{InventoryItem, ProductService};
use crate::services::sync::{SyncLogEntry, SyncService};
use shared::{time_ago, Language};

/// Dashboard service
#[derive(Clone)]
pub struct DashboardService {
    products: ProductService,
    sync: SyncService,
    client: WooCommerceClient,
    settings: InventoryConfig,
}

/// Last sync summary with a translated relative time
#[derive(Debug, Serialize)]
pub struct LastSync {
    #[serde(flatten)]
    pub entry: SyncLogEntry,
    pub time_ago: String,
}

/// Everything the dashboard page shows
#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_products: i64,
    pub total_value: Decimal,
    pub low_stock: Vec<InventoryItem>,
    pub recently_updated: Vec<InventoryItem>,
    pub last_sync: Option<LastSync>,
    pub top_selling: Vec<OnlineProduct>,
    pub low_stock_online: Vec<OnlineProduct>,
    pub recently_added: Vec<OnlineProduct>,
}

/// Widgets that can be refreshed on their own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widget {
    LowStock,
    RecentlyUpdated,
    TopSelling,
    LowStockOnline,
    RecentlyAdded,
}

impl Widget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Widget::LowStock => "low_stock",
            Widget::RecentlyUpdated => "recently_updated",
            Widget::TopSelling => "top_selling",
            Widget::LowStockOnline => "low_stock_online",
            Widget::RecentlyAdded => "recently_added",
        }
    }

    /// Whether the widget needs the online store
    pub fn is_online(&self) -> bool {
        matches!(
            self,
            Widget::TopSelling | Widget::LowStockOnline | Widget::RecentlyAdded
        )
    }
}

impl FromStr for Widget {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low_stock" => Ok(Widget::LowStock),
            "recently_updated" => Ok(Widget::RecentlyUpdated),
            "top_selling" => Ok(Widget::TopSelling),
            "low_stock_online" => Ok(Widget::LowStockOnline),
            "recently_added" => Ok(Widget::RecentlyAdded),
            other => Err(AppError::NotFound(format!("Widget '{}'", other))),
        }
    }
}

/// Rows of a single widget
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WidgetData {
    Local(Vec<InventoryItem>),
    Online(Vec<OnlineProduct>),
}

#[derive(Debug, Serialize)]
pub struct WidgetResponse {
    pub widget: &'static str,
    pub items: WidgetData,
}

/// Log a failed online widget and show it empty
fn degrade<T>(widget: Widget, result: AppResult<Vec<T>>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        tracing::warn!(widget = widget.as_str(), error = %e, "Online widget unavailable");
        Vec::new()
    })
}

impl DashboardService {
    pub fn new(db: PgPool, client: WooCommerceClient, config: &Config) -> Self {
        Self {
            products: ProductService::new(db.clone()),
            sync: SyncService::new(db, client.clone(), config),
            client,
            settings: config.inventory.clone(),
        }
    }

    fn limit(&self) -> i64 {
        self.settings.dashboard_widget_limit.max(1)
    }

    pub async fn stats(&self, lang: Language) -> AppResult<DashboardStats> {
        let limit = self.limit();

        let total_products = self.products.count_all().await?;
        let total_value = self.products.total_value().await?;
        let low_stock = self.products.low_stock(limit).await?;
        let recently_updated = self.products.recently_updated(limit).await?;
        let last_sync = self.last_sync(lang).await?;

        let (top_selling, low_stock_online, recently_added) = tokio::join!(
            self.top_selling(),
            self.low_stock_online(),
            self.recently_added(),
        );

        Ok(DashboardStats {
            total_products,
            total_value,
            low_stock,
            recently_updated,
            last_sync,
            top_selling: degrade(Widget::TopSelling, top_selling),
            low_stock_online: degrade(Widget::LowStockOnline, low_stock_online),
            recently_added: degrade(Widget::RecentlyAdded, recently_added),
        })
    }

    pub async fn last_sync(&self, lang: Language) -> AppResult<Option<LastSync>> {
        let now = Utc::now();
        Ok(self.sync.last_sync().await?.map(|entry| LastSync {
            time_ago: time_ago(entry.sync_date, now, lang),
            entry,
        }))
    }

    /// Refresh one widget
    pub async fn widget(&self, widget: Widget) -> AppResult<WidgetResponse> {
        let limit = self.limit();
        let items = match widget {
            Widget::LowStock => WidgetData::Local(self.products.low_stock(limit).await?),
            Widget::RecentlyUpdated => {
                WidgetData::Local(self.products.recently_updated(limit).await?)
            }
            Widget::TopSelling => WidgetData::Online(degrade(widget, self.top_selling().await)),
            Widget::LowStockOnline => {
                WidgetData::Online(degrade(widget, self.low_stock_online().await))
            }
            Widget::RecentlyAdded => {
                WidgetData::Online(degrade(widget, self.recently_added().await))
            }
        };

        Ok(WidgetResponse {
            widget: widget.as_str(),
            items,
        })
    }

    async fn top_selling(&self) -> AppResult<Vec<OnlineProduct>> {
        self.client.get_top_selling_products(self.limit() as u32).await
    }

    async fn low_stock_online(&self) -> AppResult<Vec<OnlineProduct>> {
        self.client
            .get_low_stock_products(self.settings.online_low_stock_threshold, self.limit() as usize)
            .await
    }

    async fn recently_added(&self) -> AppResult<Vec<OnlineProduct>> {
        self.client
            .get_recently_added_products(self.settings.recently_added_days, self.limit() as u32)
            .await
    }
}
