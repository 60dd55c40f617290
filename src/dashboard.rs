// 📊 Dashboard - current inventory and the low-stock table

use crate::error::StoreResult;
use crate::models::{parse_records, Product};
use crate::store::RecordStore;
use serde::Serialize;

pub const INVENTORY_COLUMNS: [&str; 7] = [
    "SKU",
    "Book",
    "Language",
    "Stock",
    "Min Stock",
    "Cost Price",
    "Selling Price",
];

pub const LOW_STOCK_COLUMNS: [&str; 4] = ["SKU", "Book", "Stock", "Min Stock"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRow {
    pub sku: String,
    pub book: String,
    pub language: String,
    pub stock_quantity: i64,
    pub min_stock: i64,
    pub cost_price: i64,
    pub selling_price: i64,
}

impl InventoryRow {
    /// Cells in `INVENTORY_COLUMNS` order
    pub fn cells(&self) -> [String; 7] {
        [
            self.sku.clone(),
            self.book.clone(),
            self.language.clone(),
            self.stock_quantity.to_string(),
            self.min_stock.to_string(),
            self.cost_price.to_string(),
            self.selling_price.to_string(),
        ]
    }
}

impl From<&Product> for InventoryRow {
    fn from(p: &Product) -> Self {
        InventoryRow {
            sku: p.sku.clone(),
            book: p.book.clone(),
            language: p.language.clone(),
            stock_quantity: p.stock_quantity,
            min_stock: p.min_stock,
            cost_price: p.cost_price,
            selling_price: p.selling_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockRow {
    pub sku: String,
    pub book: String,
    pub stock_quantity: i64,
    pub min_stock: i64,
}

impl LowStockRow {
    pub fn cells(&self) -> [String; 4] {
        [
            self.sku.clone(),
            self.book.clone(),
            self.stock_quantity.to_string(),
            self.min_stock.to_string(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub inventory: Vec<InventoryRow>,
    pub low_stock: Vec<LowStockRow>,
}

impl Dashboard {
    pub fn from_products(products: &[Product]) -> Self {
        let inventory = products.iter().map(InventoryRow::from).collect();
        let low_stock = products
            .iter()
            .filter(|p| p.is_low_stock())
            .map(|p| LowStockRow {
                sku: p.sku.clone(),
                book: p.book.clone(),
                stock_quantity: p.stock_quantity,
                min_stock: p.min_stock,
            })
            .collect();

        Dashboard {
            inventory,
            low_stock,
        }
    }

    /// Fetch the Products table and build the view
    pub async fn load<S: RecordStore + ?Sized>(store: &S, products_table_id: &str) -> StoreResult<Self> {
        let records = store.fetch_display_records(products_table_id).await?;
        let products: Vec<Product> = parse_records(records);
        Ok(Self::from_products(&products))
    }

    /// No product at or below its threshold
    pub fn all_clear(&self) -> bool {
        self.low_stock.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{to_record, NewProduct};
    use crate::schema::PRODUCTS;
    use crate::testing::MemoryStore;

    fn product(sku: &str, stock: i64, min: i64) -> Product {
        Product {
            id: 1,
            sku: sku.to_string(),
            language: "English".to_string(),
            book: "Gita".to_string(),
            cost_price: 40,
            selling_price: 60,
            stock_quantity: stock,
            min_stock: min,
        }
    }

    #[test]
    fn test_low_stock_includes_threshold() {
        let dashboard = Dashboard::from_products(&[
            product("A", 4, 5),
            product("B", 5, 5),
            product("C", 6, 5),
        ]);

        assert_eq!(dashboard.inventory.len(), 3);
        let low: Vec<&str> = dashboard.low_stock.iter().map(|r| r.sku.as_str()).collect();
        assert_eq!(low, vec!["A", "B"], "stock equal to min counts as low");
        assert!(!dashboard.all_clear());
    }

    #[test]
    fn test_all_clear() {
        let dashboard = Dashboard::from_products(&[product("A", 50, 5)]);
        assert!(dashboard.all_clear());
        assert!(Dashboard::from_products(&[]).all_clear());
    }

    #[test]
    fn test_cells_follow_column_order() {
        let row = InventoryRow::from(&product("BG-EN-01", 12, 5));
        assert_eq!(
            row.cells(),
            ["BG-EN-01", "Gita", "English", "12", "5", "40", "60"].map(String::from)
        );
        assert_eq!(row.cells().len(), INVENTORY_COLUMNS.len());
    }

    #[tokio::test]
    async fn test_load_from_store() {
        let store = MemoryStore::with_project("ISKMP");
        store.add_table(
            &PRODUCTS,
            vec![
                to_record(&NewProduct {
                    sku: "RM-TA-01".to_string(),
                    book: "Ramayan".to_string(),
                    stock_quantity: 0,
                    min_stock: 5,
                    ..Default::default()
                })
                .unwrap(),
                to_record(&NewProduct {
                    sku: "RM-EN-01".to_string(),
                    book: "Ramayan".to_string(),
                    stock_quantity: 30,
                    min_stock: 5,
                    ..Default::default()
                })
                .unwrap(),
            ],
        );

        let dashboard = Dashboard::load(&store, "tbl_1").await.unwrap();
        assert_eq!(dashboard.inventory.len(), 2);
        assert_eq!(dashboard.low_stock.len(), 1);
        assert_eq!(dashboard.low_stock[0].sku, "RM-TA-01");
    }
}
