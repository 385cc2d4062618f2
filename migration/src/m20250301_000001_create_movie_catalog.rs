use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(pk_auto(Movies::Id))
                    .col(string(Movies::Title))
                    .col(string(Movies::SearchTitle))
                    .col(integer(Movies::Year))
                    .col(string(Movies::Format))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_title_year_format")
                    .table(Movies::Table)
                    .col(Movies::Title)
                    .col(Movies::Year)
                    .col(Movies::Format)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_search_title")
                    .table(Movies::Table)
                    .col(Movies::SearchTitle)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Actors::Table)
                    .if_not_exists()
                    .col(pk_auto(Actors::Id))
                    .col(string(Actors::Name))
                    .col(string(Actors::SearchName))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_actors_name_unique")
                    .table(Actors::Table)
                    .col(Actors::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_actors_search_name")
                    .table(Actors::Table)
                    .col(Actors::SearchName)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieActors::Table)
                    .if_not_exists()
                    .col(integer(MovieActors::MovieId))
                    .col(integer(MovieActors::ActorId))
                    .primary_key(
                        Index::create()
                            .col(MovieActors::MovieId)
                            .col(MovieActors::ActorId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_actors_movie")
                            .from(MovieActors::Table, MovieActors::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_actors_actor")
                            .from(MovieActors::Table, MovieActors::ActorId)
                            .to(Actors::Table, Actors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_actors_actor")
                    .table(MovieActors::Table)
                    .col(MovieActors::ActorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(MovieActors::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Actors::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movies::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movies {
    Table,
    Id,
    Title,
    SearchTitle,
    Year,
    Format,
}

#[derive(DeriveIden)]
enum Actors {
    Table,
    Id,
    Name,
    SearchName,
}

#[derive(DeriveIden)]
enum MovieActors {
    Table,
    MovieId,
    ActorId,
}
