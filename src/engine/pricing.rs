// ==========================================
// Fuel Dispatch - Fuel price book
// ==========================================
// Prices are pass-through values (currency per liter); the engine
// only multiplies with them.
// ==========================================

use crate::domain::types::FuelType;
use crate::engine::error::{DispatchError, DispatchResult};
use crate::engine::guard;
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Debug)]
pub struct PriceBook {
    prices: RwLock<BTreeMap<FuelType, f64>>,
}

impl PriceBook {
    pub fn default_prices() -> BTreeMap<FuelType, f64> {
        BTreeMap::from([
            (FuelType::Ai92, 2.35),
            (FuelType::Ai95, 2.45),
            (FuelType::Ai98, 2.67),
            (FuelType::Diesel, 2.45),
        ])
    }

    pub fn new(prices: BTreeMap<FuelType, f64>) -> Self {
        Self {
            prices: RwLock::new(prices),
        }
    }

    pub fn validate_price(fuel_type: FuelType, price: f64) -> DispatchResult<()> {
        if !price.is_finite() || price < 0.0 {
            return Err(DispatchError::InvalidPrice(format!(
                "{} price must be a non-negative number, got {}",
                fuel_type, price
            )));
        }
        Ok(())
    }

    pub fn set(&self, fuel_type: FuelType, price: f64) -> DispatchResult<()> {
        Self::validate_price(fuel_type, price)?;
        guard::write(&self.prices).insert(fuel_type, price);
        Ok(())
    }

    /// Price for a fuel type; 0 when unpriced
    pub fn price(&self, fuel_type: FuelType) -> f64 {
        guard::read(&self.prices)
            .get(&fuel_type)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn all(&self) -> BTreeMap<FuelType, f64> {
        guard::read(&self.prices).clone()
    }
}

impl Default for PriceBook {
    fn default() -> Self {
        Self::new(Self::default_prices())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prices() {
        let book = PriceBook::default();
        assert_eq!(book.price(FuelType::Ai98), 2.67);
        assert_eq!(book.all().len(), 4);
    }

    #[test]
    fn test_set_rejects_invalid() {
        let book = PriceBook::default();
        book.set(FuelType::Ai92, 2.50).unwrap();
        assert_eq!(book.price(FuelType::Ai92), 2.50);

        assert!(book.set(FuelType::Ai92, -1.0).is_err());
        assert!(book.set(FuelType::Ai92, f64::INFINITY).is_err());
        assert_eq!(book.price(FuelType::Ai92), 2.50);
    }
}
