/// Column names of the two source datasets. These are a hard contract with
/// the input files.

/// Orders sheet of the Superstore workbook.
pub mod orders {
    pub const ORDER_ID: &str = "Order ID";
    pub const ORDER_DATE: &str = "Order Date";
    pub const CUSTOMER_NAME: &str = "Customer Name";
    pub const PRODUCT_NAME: &str = "Product Name";
    pub const SEGMENT: &str = "Segment";
    pub const REGION: &str = "Region";
    pub const STATE: &str = "State";
    pub const CATEGORY: &str = "Category";
    pub const SALES: &str = "Sales";
    pub const PROFIT: &str = "Profit";
    pub const DISCOUNT: &str = "Discount";
    pub const QUANTITY: &str = "Quantity";
    /// Derived from `Order Date` at load time.
    pub const MONTH: &str = "Month";

    pub const SHEET: &str = "Orders";
    pub const RETURNS_SHEET: &str = "Returns";
    pub const PEOPLE_SHEET: &str = "People";

    /// Every column some dashboard view reads.
    pub const REQUIRED: &[&str] = &[
        ORDER_ID,
        ORDER_DATE,
        CUSTOMER_NAME,
        PRODUCT_NAME,
        SEGMENT,
        REGION,
        STATE,
        CATEGORY,
        SALES,
        PROFIT,
        DISCOUNT,
        QUANTITY,
    ];
}

/// Purchase-record CSV.
pub mod purchases {
    pub const USER_ID: &str = "user_id";
    pub const PRODUCT_NAME: &str = "product_name";
    pub const ACTUAL_PRICE: &str = "actual_price";
    pub const DISCOUNT_PERCENTAGE: &str = "discount_percentage";

    pub const REQUIRED: &[&str] = &[USER_ID, PRODUCT_NAME, ACTUAL_PRICE, DISCOUNT_PERCENTAGE];
}
