use super::Engine;

use crate::{
    api::ShopAPI,
    distance::{check_proximity, distance_kilometers, ProximityCheck},
    entities::{Coordinates, RankedShop, Shop},
    error::Error,
};

impl ShopAPI for Engine {
    /// Shops offering `specialty` first, then nearest first.
    #[tracing::instrument(skip(self, shops))]
    fn rank_shops(
        &self,
        origin: Coordinates,
        shops: Vec<Shop>,
        specialty: Option<String>,
    ) -> Result<Vec<RankedShop>, Error> {
        origin.validate()?;

        let mut ranked = shops
            .into_iter()
            .map(|shop| -> Result<RankedShop, Error> {
                shop.coordinates.validate()?;

                let has_selected_specialty = specialty
                    .as_deref()
                    .map_or(false, |specialty| shop.has_specialty(specialty));

                Ok(RankedShop {
                    distance: distance_kilometers(origin, shop.coordinates),
                    has_selected_specialty,
                    shop,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        ranked.sort_by(|a, b| {
            b.has_selected_specialty
                .cmp(&a.has_selected_specialty)
                .then(a.distance.total_cmp(&b.distance))
        });
        ranked.truncate(self.config.shop_list_limit);

        Ok(ranked)
    }

    fn check_shop_proximity(
        &self,
        origin: Coordinates,
        shop: &Shop,
    ) -> Result<ProximityCheck, Error> {
        origin.validate()?;
        shop.coordinates.validate()?;

        let check = check_proximity(origin, shop.coordinates, self.config.shop_proximity);
        if check.is_far {
            tracing::info!(shop_id = %shop.id, distance = check.distance, "shop may be too far");
        }

        Ok(check)
    }
}
