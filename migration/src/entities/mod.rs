pub mod product;
pub mod product_view;
pub mod shop;
pub mod shop_view;

pub use product::Entity as ProductEntity;
pub use product_view::Entity as ProductViewEntity;
pub use shop::Entity as ShopEntity;
pub use shop_view::Entity as ShopViewEntity;
