// ==========================================
// Fuel Dispatch - Demo seed data
// ==========================================
// Five tankers and four stations around Krupki/Borisov; loaded by
// the `demo` command when the database has neither.
// ==========================================

use crate::domain::station::{FuelLevel, Station};
use crate::domain::truck::Truck;
use crate::domain::types::FuelType;

pub fn demo_trucks() -> Vec<Truck> {
    vec![
        Truck::new("t001", "А123БВ 77", FuelType::Ai95, 30000.0, "Иванов И.И."),
        Truck::new("t002", "С456ДЕ 77", FuelType::Diesel, 40000.0, "Петров П.П."),
        Truck::new("t003", "Е789ЖЗ 99", FuelType::Ai92, 25000.0, "Сидоров С.С."),
        Truck::new("t004", "И012КЛ 50", FuelType::Ai98, 20000.0, "Кузнецов К.К."),
        Truck::new("t005", "М345НО 50", FuelType::Diesel, 40000.0, "Васильев В.В."),
    ]
}

pub fn demo_stations() -> Vec<Station> {
    vec![
        Station::new(
            "s001",
            "Белоруснефть АЗС №15",
            "г. Крупки, ул. Московская, 107",
            (54.3215, 29.1553),
        )
        .with_level(FuelLevel::new(FuelType::Ai95, 8000.0, 10000.0, 40000.0))
        .with_level(FuelLevel::new(FuelType::Diesel, 18000.0, 15000.0, 50000.0))
        .with_level(FuelLevel::new(FuelType::Ai92, 4000.0, 8000.0, 30000.0)),
        Station::new(
            "s002",
            "Белоруснефть АЗС №14",
            "г. Крупки, ул. Черняховского, 1",
            (54.3168, 29.1351),
        )
        .with_level(FuelLevel::new(FuelType::Ai92, 15000.0, 8000.0, 30000.0))
        .with_level(FuelLevel::new(FuelType::Ai95, 22000.0, 10000.0, 40000.0)),
        Station::new(
            "s003",
            "Газпромнефть АЗС №53",
            "Трасса М1/Е30, 462-й км",
            (54.2985, 29.2311),
        )
        .with_level(FuelLevel::new(FuelType::Ai95, 9000.0, 12000.0, 45000.0))
        .with_level(FuelLevel::new(FuelType::Diesel, 35000.0, 15000.0, 60000.0))
        .with_level(FuelLevel::new(FuelType::Ai98, 6000.0, 5000.0, 20000.0)),
        Station::new(
            "s004",
            "United Company АЗС №3",
            "г. Борисов, ул. Гагарина, 105а",
            (54.2435, 28.5033),
        )
        .with_level(FuelLevel::new(FuelType::Ai92, 11000.0, 8000.0, 30000.0))
        .with_level(FuelLevel::new(FuelType::Ai95, 18000.0, 10000.0, 40000.0))
        .with_level(FuelLevel::new(FuelType::Diesel, 9000.0, 10000.0, 50000.0)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_data_is_valid() {
        for truck in demo_trucks() {
            truck.check_attributes().unwrap();
        }
        let stations = demo_stations();
        for station in &stations {
            station.check_invariants().unwrap();
        }
        // s001, s003 and s004 start below minimum on at least one tank
        let low: Vec<_> = stations
            .iter()
            .filter(|s| !s.deficient_types().is_empty())
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(low, vec!["s001", "s003", "s004"]);
    }
}
